//! Local preview server for a built site

use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use tiny_http::{Header, Method, Response, Server, StatusCode};

pub struct PreviewOpts {
    pub out_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub no_open: bool,
    pub index: String,
}

pub fn run_preview(opts: PreviewOpts) -> Result<()> {
    if !opts.out_dir.exists() || !opts.out_dir.is_dir() {
        bail!("output dir does not exist; run `bloggen build` first");
    }

    let (server, addr) = bind_server(&opts.host, opts.port)?;
    let url = format!("http://{}:{}/", opts.host, addr.port());

    println!("Preview: {url}");
    println!("Serving: {}", opts.out_dir.display());

    if !opts.no_open {
        if let Err(err) = webbrowser::open(&url) {
            eprintln!("warning: failed to open browser: {err}");
        }
    }

    serve_loop(server, opts.out_dir, opts.index)
}

fn bind_server(host: &str, port: u16) -> Result<(Server, SocketAddr)> {
    let addr = format!("{host}:{port}");
    let server = Server::http(&addr)
        .map_err(|err| anyhow::anyhow!("failed to bind to {addr}: {err}"))?;
    let actual = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| anyhow::anyhow!("failed to resolve socket address"))?;
    Ok((server, actual))
}

fn serve_loop(server: Server, out_dir: PathBuf, index: String) -> Result<()> {
    loop {
        let request = match server.recv() {
            Ok(request) => request,
            Err(err) => {
                eprintln!("warning: failed to receive request: {err}");
                continue;
            }
        };
        let response = match handle_request(&request, &out_dir, &index) {
            Ok(response) => response,
            Err(err) => {
                eprintln!("warning: {err}");
                Response::from_string("Internal Server Error")
                    .with_status_code(StatusCode(500))
                    .boxed()
            }
        };
        if let Err(err) = request.respond(response) {
            eprintln!("warning: failed to send response: {err}");
        }
    }
}

fn handle_request(
    request: &tiny_http::Request,
    out_dir: &Path,
    index: &str,
) -> Result<Response<Box<dyn Read + Send>>> {
    if request.method() != &Method::Get && request.method() != &Method::Head {
        return Ok(Response::from_string("Method Not Allowed")
            .with_status_code(StatusCode(405))
            .boxed());
    }

    let rel_path = match sanitize_path(request.url(), index) {
        Some(path) => path,
        None => {
            return Ok(Response::from_string("Not Found")
                .with_status_code(StatusCode(404))
                .boxed());
        }
    };

    let full_path = out_dir.join(&rel_path);
    if !full_path.exists() || full_path.is_dir() {
        return Ok(Response::from_string("Not Found")
            .with_status_code(StatusCode(404))
            .boxed());
    }

    let file = File::open(&full_path)
        .with_context(|| format!("failed to open {}", full_path.display()))?;

    if request.method() == &Method::Head {
        return Ok(Response::empty(200)
            .with_header(content_type_header(&full_path))
            .boxed());
    }

    Ok(Response::from_file(file)
        .with_header(content_type_header(&full_path))
        .boxed())
}

fn sanitize_path(url: &str, index: &str) -> Option<PathBuf> {
    let path = url.split('?').next().unwrap_or(url);
    let decoded = urlencoding::decode(path).ok()?;
    if decoded.contains('\\') {
        return None;
    }
    let trimmed = decoded.trim_start_matches('/');
    let effective = if trimmed.is_empty() { index } else { trimmed };

    let mut clean = PathBuf::new();
    for component in Path::new(effective).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "xml" => "application/xml; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn content_type_header(path: &Path) -> Header {
    Header::from_bytes("Content-Type", content_type_for(path)).expect("valid header")
}
