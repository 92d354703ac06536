use std::sync::Once;

pub mod http;
pub mod text;

static RUSTLS_PROVIDER: Once = Once::new();

/// reqwest 使用 rustls-no-provider，建立 client 前必須先安裝 crypto provider
pub fn ensure_rustls_crypto_provider() {
    RUSTLS_PROVIDER.call_once(|| {
        // 已被其他元件安裝時會回傳 Err，忽略即可
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
