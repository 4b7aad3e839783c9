use std::env;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, ExitCode};
use std::time::Duration;

use keratovision::{compose, StoredProfile, VisionProfile};
use keratovision_web::preview::{build_preview_html, render_preview_payload};

const DEFAULT_OUT_PATH: &str = "target/web-preview/index.html";
const DEFAULT_PORT: u16 = 42818;

#[derive(Clone, Debug)]
struct Args {
    profile_path: Option<String>,
    out_path: String,
    css_only: bool,
    serve: bool,
    open_browser: bool,
    port: u16,
    overrides: StoredProfile,
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cli = parse_args(args)?;
    let profile = load_profile(&cli)?;

    if cli.serve {
        return run_server(profile, cli.port, cli.open_browser);
    }

    if cli.css_only {
        print!("{}", compose(&profile).to_css());
        return Ok(());
    }

    if cli.out_path.is_empty() {
        return Err("--out must not be empty".to_string());
    }
    if let Some(parent) = Path::new(&cli.out_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }

    let payload = render_preview_payload(&profile).map_err(|e| e.to_string())?;
    let data_json = serde_json::to_string(&payload).map_err(|e| e.to_string())?;
    let html = build_preview_html(&data_json, false);
    std::fs::write(&cli.out_path, html).map_err(|e| e.to_string())?;

    println!(
        "wrote web preview to {} (active={}, stylesheet_bytes={}, markers={})",
        cli.out_path,
        payload.active,
        payload.stylesheet.len(),
        payload.slots.iter().filter(|s| s.marker.is_some()).count(),
    );
    Ok(())
}

fn load_profile(cli: &Args) -> Result<VisionProfile, String> {
    let base = match cli.profile_path.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| format!("read {}: {}", path, e))?;
            VisionProfile::from_json(&raw).map_err(|e| format!("invalid profile {}: {}", path, e))?
        }
        None => VisionProfile::default(),
    };
    Ok(cli.overrides.merge_onto(base))
}

fn run_server(initial: VisionProfile, port: u16, open_browser: bool) -> Result<(), String> {
    let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| e.to_string())?;
    listener.set_nonblocking(false).map_err(|e| e.to_string())?;

    let addr = listener.local_addr().map_err(|e| e.to_string())?;
    let initial_payload = render_preview_payload(&initial).map_err(|e| e.to_string())?;
    let initial_json = serde_json::to_string(&initial_payload).map_err(|e| e.to_string())?;
    let html = build_preview_html(&initial_json, true);
    let url = format!("http://{}:{}/", addr.ip(), addr.port());

    log::info!("serving web preview at {}", url);

    if open_browser {
        try_open_browser(&url);
    }

    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("accept error: {}", err);
                continue;
            }
        };
        if let Err(err) = stream.set_read_timeout(Some(Duration::from_secs(15))) {
            log::warn!("set timeout failed: {}", err);
        }
        if let Err(err) = handle_connection(&mut stream, &initial, &html) {
            log::warn!("request error: {}", err);
        }
    }

    Ok(())
}

fn try_open_browser(url: &str) {
    let mut opened = false;

    if let Ok(status) = Command::new("open").arg(url).status() {
        if status.success() {
            opened = true;
        }
    }

    if !opened {
        if let Err(err) = Command::new("xdg-open").arg(url).status() {
            log::debug!("xdg-open failed: {}", err);
        }
    }
}

fn handle_connection(
    stream: &mut TcpStream,
    initial: &VisionProfile,
    html: &str,
) -> Result<(), String> {
    let req = read_http_request(stream)?;
    let path = req.path.split('?').next().unwrap_or(&req.path);
    log::debug!("{} {}", req.method, path);

    match (req.method.as_str(), path) {
        ("GET", "/") => write_http_response(
            stream,
            "200 OK",
            "text/html; charset=utf-8",
            html.as_bytes(),
        ),
        ("GET", "/api/default-profile") => {
            let body = serde_json::to_vec(initial).map_err(|e| e.to_string())?;
            write_http_response(stream, "200 OK", "application/json", &body)
        }
        ("GET", "/stylesheet.css") => {
            let css = compose(initial).to_css();
            write_http_response(stream, "200 OK", "text/css; charset=utf-8", css.as_bytes())
        }
        ("POST", "/api/render") => {
            let parsed = match serde_json::from_slice::<StoredProfile>(&req.body) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let body = serde_json::json!({ "error": format!("invalid profile: {}", err) });
                    return write_http_response(
                        stream,
                        "400 Bad Request",
                        "application/json",
                        body.to_string().as_bytes(),
                    );
                }
            };
            let payload =
                render_preview_payload(&parsed.merge_with_defaults()).map_err(|e| e.to_string())?;
            let body = serde_json::to_vec(&payload).map_err(|e| e.to_string())?;
            write_http_response(stream, "200 OK", "application/json", &body)
        }
        ("GET", "/favicon.ico") => write_http_response(stream, "204 No Content", "text/plain", &[]),
        _ => write_http_response(
            stream,
            "404 Not Found",
            "application/json",
            br#"{"error":"not_found"}"#,
        ),
    }
}

/// Limit for both the request head and the declared body length.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

fn read_http_request(stream: &mut TcpStream) -> Result<HttpRequest, String> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];
    let mut header_end = None;

    while header_end.is_none() {
        let n = stream.read(&mut chunk).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(idx) = find_header_end(&buf) {
            header_end = Some(idx);
            break;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Err("request header too large".to_string());
        }
    }

    let header_end = header_end.ok_or_else(|| "incomplete http request".to_string())?;
    let (method, path, content_length) = parse_request_head(&buf[..header_end])?;

    let mut body = Vec::with_capacity(content_length);
    if buf.len() > header_end + 4 {
        body.extend_from_slice(&buf[(header_end + 4)..]);
    }

    while body.len() < content_length {
        let n = stream.read(&mut chunk).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    if body.len() > content_length {
        body.truncate(content_length);
    }

    Ok(HttpRequest { method, path, body })
}

fn parse_request_head(header: &[u8]) -> Result<(String, String, usize), String> {
    let header_text = String::from_utf8_lossy(header);
    let mut lines = header_text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| "missing request line".to_string())?;

    let mut req_parts = request_line.split_whitespace();
    let method = req_parts
        .next()
        .ok_or_else(|| "missing method".to_string())?
        .to_string();
    let path = req_parts
        .next()
        .ok_or_else(|| "missing path".to_string())?
        .to_string();

    let mut content_length = 0usize;
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<usize>().unwrap_or(0);
            }
        }
    }
    if content_length > MAX_REQUEST_BYTES {
        return Err(format!(
            "request body too large: {} bytes (limit {})",
            content_length, MAX_REQUEST_BYTES
        ));
    }
    Ok((method, path, content_length))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn write_http_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), String> {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream
        .write_all(header.as_bytes())
        .map_err(|e| e.to_string())?;
    stream.write_all(body).map_err(|e| e.to_string())
}

fn parse_f64_flag(args: &[String], i: usize, flag: &str) -> Result<f64, String> {
    let v = args
        .get(i + 1)
        .ok_or_else(|| format!("{} requires a value", flag))?;
    let parsed = v
        .parse::<f64>()
        .map_err(|_| format!("invalid {} value '{}'", flag, v))?;
    if !parsed.is_finite() {
        return Err(format!("{} must be finite", flag));
    }
    Ok(parsed)
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }

    let has_positional_profile = args.get(1).is_some_and(|v| !v.starts_with("--"));

    let mut cfg = Args {
        profile_path: has_positional_profile.then(|| args[1].clone()),
        out_path: DEFAULT_OUT_PATH.to_string(),
        css_only: false,
        serve: false,
        open_browser: false,
        port: DEFAULT_PORT,
        overrides: StoredProfile::default(),
    };

    let mut i = if has_positional_profile { 2usize } else { 1usize };
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--out" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--out requires a value".to_string())?;
                cfg.out_path = v.clone();
                i += 2;
            }
            "--css" => {
                cfg.css_only = true;
                i += 1;
            }
            "--serve" => {
                cfg.serve = true;
                i += 1;
            }
            "--open" => {
                cfg.open_browser = true;
                i += 1;
            }
            "--port" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--port requires a value".to_string())?;
                cfg.port = v
                    .parse::<u16>()
                    .map_err(|_| format!("invalid --port value '{}'", v))?;
                i += 2;
            }
            "--axis" => {
                cfg.overrides.astigmat_axis = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--power" => {
                cfg.overrides.astigmat_power = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--severity" => {
                cfg.overrides.kerato_severity = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--font-size" => {
                cfg.overrides.font_size = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--luminance" => {
                cfg.overrides.luminance_clamp = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--coma-angle" => {
                cfg.overrides.coma_angle = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--coma-intensity" => {
                cfg.overrides.coma_intensity = Some(parse_f64_flag(&args, i, flag)?);
                i += 2;
            }
            "--polarity" => {
                cfg.overrides.polarity_reversed = Some(true);
                i += 1;
            }
            "--guide" => {
                cfg.overrides.reading_guide = Some(true);
                i += 1;
            }
            "--no-edge" => {
                cfg.overrides.edge_enhancement = Some(false);
                i += 1;
            }
            "--no-chromatic" => {
                cfg.overrides.chromatic_correction = Some(false);
                i += 1;
            }
            "--disabled" => {
                cfg.overrides.enabled = Some(false);
                i += 1;
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
    }

    if cfg.serve && cfg.css_only {
        return Err("--css and --serve are mutually exclusive".to_string());
    }

    Ok(cfg)
}

fn help_text() -> &'static str {
    r#"web-preview - adaptive stylesheet preview for keratovision

USAGE:
  cargo run -p keratovision-web --bin web-preview -- [profile.json] [options]

MODES:
  default: generate standalone HTML file at --out
  --css:   print the composed stylesheet to stdout
  --serve: start local preview server with live re-render API

OPTIONS:
  --out <file>                output HTML path (default: target/web-preview/index.html)
  --serve                     start local server mode for live re-render
  --open                      open browser automatically (use with --serve)
  --port <n>                  server port in --serve mode (default: 42818)

PROFILE OVERRIDES (applied on top of profile.json or the defaults):
  --axis <deg>                astigmatism axis (default: 90)
  --power <D>                 astigmatism power in diopters, 0-6 (default: 1.5)
  --severity <s>              keratoconus severity, 0-5 (default: 2)
  --font-size <px>            base font size, 16-30 (default: 18)
  --luminance <r>             brightness clamp, 0.65-1.0 (default: 0.95)
  --coma-angle <deg>          coma direction (default: 0)
  --coma-intensity <i>        explicit coma intensity, 0 derives from severity
  --polarity                  reverse polarity (dark mode inversion)
  --guide                     enable the reading guide overlay
  --no-edge                   disable edge enhancement
  --no-chromatic              disable chromatic correction hints
  --disabled                  render with compensation disabled

LOGGING:
  RUST_LOG=debug shows per-request and per-pass detail
"#
}
