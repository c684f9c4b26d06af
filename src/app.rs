/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

use std::{
    convert::Infallible,
    fmt::{Display, Write},
    future::Future,
    io,
    net::SocketAddr,
    pin::{pin, Pin},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Body, Incoming},
    header::{self, HeaderValue},
    http::request::Parts,
    server::conn::http1,
    service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::{rt::TokioIo, server::graceful::GracefulShutdown};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::{config::FicheConfig, constants, counter::HitCounter, store::PasteStore};

/// Pause after a failed accept, so running out of descriptors does not spin the loop
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct Fiche {
    config: FicheConfig,
    store: PasteStore,
    counter: HitCounter,
}

impl Fiche {
    pub fn new(config: FicheConfig) -> Self {
        Self {
            store: PasteStore::new(&config),
            counter: HitCounter::default(),
            config,
        }
    }

    pub fn config(&self) -> &FicheConfig {
        &self.config
    }

    async fn response<B>(
        self: Arc<Self>,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let mut res = match req.uri().path() {
            "/help" => self.help_page(),
            "/count" => self.count_page(),
            _ => self.submit(remote_addr, local_addr, req).await,
        };

        res.headers_mut().insert(
            constants::SERVICE_HEADER,
            HeaderValue::from_static(constants::SERVICE_NAME),
        );

        Ok(res)
    }

    /// Store request body as a new paste and reply with its location
    async fn submit<B>(
        &self,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        req: Request<B>,
    ) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        log::info!(
            "[{}] {} {} from {} ({})",
            timestamp,
            req.method(),
            req.uri(),
            remote_addr,
            local_addr
        );

        let (parts, body) = req.into_parts();
        let content = read_body(body, &timestamp).await;

        if self.config.debug {
            log::info!("[{}] Request dump\n{}", timestamp, dump_request(&parts, &content));
        }

        match self.store.store(&content).await {
            Ok(path) => {
                log::info!("[{}] Wrote {}", timestamp, path.display());

                text_response(
                    StatusCode::OK,
                    format!(
                        "{}:{}/{}\n",
                        self.config.domain,
                        self.config.port,
                        path.display()
                    ),
                )
            }

            Err(err) => {
                log::error!("[{}] Could not store paste. {}", timestamp, err);

                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error\n".into(),
                )
            }
        }
    }

    fn help_page(&self) -> Response<Full<Bytes>> {
        let target = format!("{}:{}", self.config.domain, self.config.port);

        text_response(
            StatusCode::OK,
            format!(
                "Send me some data:\n\
                 curl -X POST --data-binary @foo.txt {target}\n\
                 curl -X POST -d 'foobar' {target}\n\
                 wget --post-data='foobar string' {target}\n"
            ),
        )
    }

    fn count_page(&self) -> Response<Full<Bytes>> {
        let count = self.counter.hit();
        log::debug!("Hit count {}", count);

        text_response(StatusCode::OK, format!("Count, {}!\n", count))
    }

    /// Run Fiche until `shutdown` resolves, then wait for open connections to finish
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), FicheError> {
        let local_addr = listener.local_addr()?;
        let graceful = GracefulShutdown::new();
        let mut shutdown = pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            log::warn!("Could not accept connection. {}", err);

                            if accept_backoff(shutdown.as_mut()).await {
                                continue;
                            }
                            break;
                        }
                    };

                    let app = self.clone();
                    let conn = http1::Builder::new().serve_connection(
                        TokioIo::new(stream),
                        service_fn(move |req: Request<Incoming>| {
                            app.clone().response(remote_addr, local_addr, req)
                        }),
                    );
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            log::debug!("Connection with {} closed. {}", remote_addr, err);
                        }
                    });
                }

                _ = &mut shutdown => break,
            }
        }

        drop(listener);
        log::info!("Waiting for open connections to finish...");
        graceful.shutdown().await;

        Ok(())
    }
}

/// Wait before accepting again. Returns `false` if shutdown resolved meanwhile.
async fn accept_backoff<F: Future<Output = ()>>(shutdown: Pin<&mut F>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
        _ = shutdown => false,
    }
}

/// Bind server socket
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, FicheError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| FicheError::Bind { addr, source })
}

/// Read whole body. A failed read keeps whatever arrived before it.
async fn read_body<B>(body: B, timestamp: &str) -> Vec<u8>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let mut body = pin!(body);
    let mut content = Vec::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    content.extend_from_slice(&data);
                }
            }

            Err(err) => {
                log::warn!("[{}] Could not read body! {}", timestamp, err);
                break;
            }
        }
    }

    content
}

fn dump_request(parts: &Parts, content: &[u8]) -> String {
    let mut dump = format!("{} {} {:?}\r\n", parts.method, parts.uri, parts.version);

    for (name, value) in &parts.headers {
        let _ = write!(dump, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }

    dump.push_str("\r\n");
    dump.push_str(&String::from_utf8_lossy(content));

    dump
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    res
}

#[derive(Debug, Error)]
pub enum FicheError {
    #[error("could not bind {addr}. {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),
}
