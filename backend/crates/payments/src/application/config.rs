//! Application Configuration
//!
//! Gateway credentials and the public base URL used for return and notify
//! URLs. Missing credentials make the gateway reject every webhook.

use std::time::Duration;

use platform::client::IpAllowList;

/// Source ranges PayFast sends notifications from
pub const PAYFAST_IP_RANGES: [&str; 5] = [
    "197.97.145.144/28",
    "41.74.179.192/27",
    "102.216.36.0/28",
    "102.216.36.128/28",
    "144.126.193.139",
];

/// PayFast card gateway configuration
#[derive(Debug, Clone)]
pub struct PayFastConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    /// Salt appended to the signature string when set on the merchant account
    pub passphrase: Option<String>,
    /// Use `sandbox.payfast.co.za` instead of `www.payfast.co.za`
    pub sandbox: bool,
    /// Confirm each notification with `/eng/query/validate`
    pub validate_with_server: bool,
    pub validate_timeout: Duration,
    /// Reject notifications from outside `allowed_ips`
    pub check_source_ip: bool,
    pub allowed_ips: IpAllowList,
}

impl Default for PayFastConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            merchant_key: String::new(),
            passphrase: None,
            sandbox: false,
            validate_with_server: true,
            validate_timeout: Duration::from_secs(10),
            check_source_ip: true,
            // An empty list rejects everything while the check is on
            allowed_ips: IpAllowList::parse(PAYFAST_IP_RANGES).unwrap_or_default(),
        }
    }
}

impl PayFastConfig {
    /// PayFast's public sandbox merchant, no IP or server checks
    pub fn development() -> Self {
        Self {
            merchant_id: "10000100".to_string(),
            merchant_key: "46f0cd694581a".to_string(),
            sandbox: true,
            validate_with_server: false,
            check_source_ip: false,
            ..Default::default()
        }
    }

    pub fn host(&self) -> &'static str {
        if self.sandbox {
            "sandbox.payfast.co.za"
        } else {
            "www.payfast.co.za"
        }
    }

    pub fn process_url(&self) -> String {
        format!("https://{}/eng/process", self.host())
    }

    pub fn validate_url(&self) -> String {
        format!("https://{}/eng/query/validate", self.host())
    }

    pub fn is_configured(&self) -> bool {
        !self.merchant_id.is_empty() && !self.merchant_key.is_empty()
    }
}

/// Ozow instant-EFT gateway configuration
#[derive(Debug, Clone)]
pub struct OzowConfig {
    pub site_code: String,
    pub private_key: String,
    pub is_test: bool,
    pub country_code: String,
    pub currency_code: String,
    pub pay_url: String,
}

impl Default for OzowConfig {
    fn default() -> Self {
        Self {
            site_code: String::new(),
            private_key: String::new(),
            is_test: false,
            country_code: "ZA".to_string(),
            currency_code: "ZAR".to_string(),
            pay_url: "https://pay.ozow.com/".to_string(),
        }
    }
}

impl OzowConfig {
    pub fn development() -> Self {
        Self {
            is_test: true,
            ..Default::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.site_code.is_empty() && !self.private_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Base for return and notify URLs handed to the gateways
    pub public_base_url: String,
    pub payfast: PayFastConfig,
    pub ozow: OzowConfig,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
            payfast: PayFastConfig::default(),
            ozow: OzowConfig::default(),
        }
    }
}

impl PaymentsConfig {
    /// Sandbox gateways
    pub fn development() -> Self {
        Self {
            payfast: PayFastConfig::development(),
            ozow: OzowConfig::development(),
            ..Default::default()
        }
    }
}
