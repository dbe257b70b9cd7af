//! TLS acceptor construction.
//!
//! PEM loading happens here, once, at startup; the accept loop only ever
//! sees the finished `TlsAcceptor`.

use std::sync::Arc;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;

use crate::error::{Result, ServerError};

/// Build a TLS acceptor from PEM certificate-chain and private-key files.
pub fn build_acceptor(cert_path: &str, key_path: &str) -> Result<TlsAcceptor> {
    let certs = CertificateDer::pem_file_iter(cert_path)
        .map_err(|err| ServerError::Tls(format!("{cert_path}: {err}")))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| ServerError::Tls(format!("{cert_path}: {err}")))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "{cert_path}: no certificates found"
        )));
    }

    let key = PrivateKeyDer::from_pem_file(key_path)
        .map_err(|err| ServerError::Tls(format!("{key_path}: {err}")))?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ServerError::Tls(err.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}
