use bytes::Bytes;
use http_body_util::{BodyExt as _, Empty};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;

use super::tls::insecure_client_config;
use super::{Error, HttpRequest, HttpResponse, Result};

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub connect_timeout: Option<Duration>,

    /// Accept any server certificate (self-signed experiment targets).
    pub insecure_tls: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        // The OS-level TCP connect timeout can be very long (tens of seconds), which would
        // stall a probe loop when the target is down.
        Self {
            connect_timeout: Some(Duration::from_secs(3)),
            insecure_tls: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
}

impl HttpClient {
    pub fn new(opts: ClientOptions) -> Result<Self> {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(opts.connect_timeout);
        http_connector.set_nodelay(true);

        let builder = if opts.insecure_tls {
            HttpsConnectorBuilder::new().with_tls_config(insecure_client_config()?)
        } else {
            HttpsConnectorBuilder::new().with_provider_and_webpki_roots(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))?
        };

        // h2 is negotiated via ALPN on TLS targets; plaintext targets stay on HTTP/1.1.
        let https_connector = builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self { inner })
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let timeout = req.timeout;
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::UnsupportedScheme(req.url));
        }

        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let req: Request<Empty<Bytes>> = Request::builder()
            .method(req.method)
            .uri(uri)
            .body(Empty::new())?;

        let exchange = async {
            let res: hyper::Response<Incoming> = self.inner.request(req).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>(HttpResponse {
                status: parts.status.as_u16(),
                body,
            })
        };

        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, exchange).await {
                Ok(res) => res,
                Err(_) => Err(Error::Timeout(timeout)),
            },
            None => exchange.await,
        }
    }

    pub async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::head(url)).await
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }
}
