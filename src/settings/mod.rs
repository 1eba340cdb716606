use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, ValueEnum};
use inkrypt_core::inscribe::{self, InscribeClient};
use inkrypt_core::order_api::{self, FeeSettings, OrderClient};
use inkrypt_core::orders::{HttpTransport, OrderService};
use inkrypt_core::records::Address;
use inkrypt_core::session::Session;
use inkrypt_core::store::{FileStore, LocalStore};
use log::debug;

/// Where local records live and who is signed in.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory holding the local collections.
    #[arg(long, env = "INKRYPT_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Maximum total size of the local store, in bytes.
    #[arg(long, env = "INKRYPT_STORE_QUOTA", global = true)]
    pub store_quota: Option<usize>,

    /// Active wallet address. Falls back to the one recorded in the store.
    #[arg(long, env = "INKRYPT_ADDRESS", global = true)]
    pub address: Option<String>,
}

impl StoreArgs {
    pub fn store_dir(&self) -> PathBuf {
        self.store.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("inkrypt"))
                .unwrap_or_else(|| PathBuf::from(".inkrypt"))
        })
    }

    pub fn open(&self) -> Result<LocalStore<FileStore>> {
        let dir = self.store_dir();
        let mut backend = FileStore::open(&dir)
            .with_context(|| format!("opening store at {}", dir.display()))?;
        if let Some(quota) = self.store_quota {
            backend = backend.with_quota(quota);
        }
        debug!("using store at {}", dir.display());
        Ok(LocalStore::new(backend))
    }

    pub fn session(&self, store: &LocalStore<FileStore>) -> Session {
        Session::resolve(self.address.clone().map(Address::from), store)
    }
}

/// Which ordering integration to talk to.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// Flat request fields, `{code, msg, data}` responses.
    Flat,
    /// Inline base64 file payload with fee settings, bare responses.
    Files,
}

/// Connection and fee settings of the ordering service.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    #[arg(long, env = "INKRYPT_API", value_enum, default_value_t = ApiFlavor::Flat)]
    pub api: ApiFlavor,

    /// Base URL of the ordering service. Defaults per API flavor.
    #[arg(long, env = "INKRYPT_API_URL")]
    pub api_url: Option<String>,

    /// Bearer credential of the ordering service.
    #[arg(long, env = "INKRYPT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Fee rate in sat/vB (files API only).
    #[arg(long, env = "INKRYPT_FEE_RATE", default_value_t = 1.0)]
    pub fee_rate: f64,

    /// Value of the inscription output in sats (files API only).
    #[arg(long, env = "INKRYPT_OUTPUT_VALUE", default_value_t = 546)]
    pub output_value: u64,
}

impl ApiArgs {
    pub fn base_url(&self) -> &str {
        match (&self.api_url, self.api) {
            (Some(url), _) => url.as_str(),
            (None, ApiFlavor::Flat) => inscribe::DEFAULT_BASE_URL,
            (None, ApiFlavor::Files) => order_api::DEFAULT_BASE_URL,
        }
    }

    fn transport(&self) -> Result<HttpTransport> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("missing API key: pass --api-key or set INKRYPT_API_KEY"))?;
        Ok(HttpTransport::new(self.base_url(), key)?)
    }

    pub fn service(&self) -> Result<Box<dyn OrderService>> {
        let transport = self.transport()?;
        Ok(match self.api {
            ApiFlavor::Flat => Box::new(InscribeClient::new(transport)),
            ApiFlavor::Files => Box::new(OrderClient::new(
                transport,
                FeeSettings {
                    fee_rate: self.fee_rate,
                    output_value: self.output_value,
                },
            )),
        })
    }

    pub fn inscribe_client(&self) -> Result<InscribeClient> {
        if self.api != ApiFlavor::Flat {
            bail!("refunds are only offered by the flat API (--api flat)");
        }
        Ok(InscribeClient::new(self.transport()?))
    }
}
