use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;

use crate::{logging::Logger, util};

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

/// 憑證驗證失敗時才會使用的 client，不驗證伺服器憑證
static INSECURE_CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from Big5 encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceBig5 {
    /// Converts the body of a reqwest::Response from Big5 encoding to UTF-8 encoding.
    async fn text_force_big5(self) -> Result<String>;
}

#[async_trait]
impl TextForceBig5 for Response {
    async fn text_force_big5(self) -> Result<String> {
        util::text::big5_2_utf8(self.bytes().await?.as_ref())
    }
}

fn build_client(accept_invalid_certs: bool) -> Result<Client> {
    util::ensure_rustls_crypto_provider();

    Client::builder()
        // ===== 壓縮 =====
        .brotli(true)
        .gzip(true)
        .zstd(true)
        // ===== 超時設置 =====
        .connect_timeout(Duration::from_secs(8))
        .timeout(Duration::from_secs(15))
        // ===== TCP 優化 =====
        .tcp_nodelay(true)
        .tcp_keepalive(Duration::from_secs(60))
        // ===== 連接池 =====
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        // ===== Cookie 和重定向 =====
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        // ===== TLS =====
        .danger_accept_invalid_certs(accept_invalid_certs)
        // ===== Headers =====
        .referer(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| build_client(false))
}

fn get_insecure_client() -> Result<&'static Client> {
    INSECURE_CLIENT.get_or_try_init(|| build_client(true))
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
///
/// Only one attempt is made; a transport failure or an undecodable body is
/// returned to the caller as is.
pub async fn get_json<RES: DeserializeOwned>(url: &str) -> Result<RES> {
    send(get_client()?, Method::GET, url, None)
        .await?
        .json::<RES>()
        .await
        .map_err(|e| anyhow!("Error parsing response JSON: {:?}", e))
}

/// Performs an HTTP GET request and returns the response as Big5 decoded text.
///
/// When the TLS handshake fails on certificate verification the request is
/// sent once more with verification disabled before giving up.
pub async fn get_use_big5(url: &str) -> Result<String> {
    let response = match send(get_client()?, Method::GET, url, None).await {
        Ok(response) => response,
        Err(why) if is_certificate_error(&why) => {
            LOGGER.warn(format!(
                "Certificate verification failed for {}, retry without verification",
                url
            ));
            send(get_insecure_client()?, Method::GET, url, None).await?
        }
        Err(why) => return Err(why),
    };

    response
        .text_force_big5()
        .await
        .map_err(|e| anyhow!("Error parsing response text use BIG5: {:?}", e))
}

/// 判斷錯誤鏈中是否含有憑證驗證失敗
///
/// rustls 的錯誤常被 io::Error 包裝而無法 downcast，因此也比對訊息文字。
fn is_certificate_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(rustls_err) = cause.downcast_ref::<rustls::Error>() {
            return matches!(
                rustls_err,
                rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
            );
        }

        cause.to_string().to_lowercase().contains("certificate")
    })
}

/// Sends a single HTTP request and logs how long it took.
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            LOGGER.info(format!("{} {} {} ms", visit_log, response.status(), elapsed));
            response
                .error_for_status()
                .map_err(|why| anyhow!("Request to {} failed because {:?}", url, why))
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow::Error::new(why).context(format!("Failed to send request to {}", url)))
        }
    }
}
