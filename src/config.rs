use crate::gateway::momo::MomoConfig;
use crate::gateway::zalopay::ZaloPayConfig;
use clap::Args;
use std::time::Duration;

/// MoMo wallet credentials and endpoints.
#[derive(Args, Debug, Clone)]
pub struct MomoArgs {
    #[arg(long = "momo-partner-code", env = "MOMO_PARTNER_CODE", default_value = "")]
    pub partner_code: String,

    #[arg(long = "momo-access-key", env = "MOMO_ACCESS_KEY", default_value = "", hide_env_values = true)]
    pub access_key: String,

    #[arg(long = "momo-secret-key", env = "MOMO_SECRET_KEY", default_value = "", hide_env_values = true)]
    pub secret_key: String,

    #[arg(
        id = "momo_create_endpoint",
        long = "momo-create-endpoint",
        env = "MOMO_CREATE_ENDPOINT",
        default_value = "https://test-payment.momo.vn/v2/gateway/api/create"
    )]
    pub create_endpoint: String,

    #[arg(
        id = "momo_query_endpoint",
        long = "momo-query-endpoint",
        env = "MOMO_QUERY_ENDPOINT",
        default_value = "https://test-payment.momo.vn/v2/gateway/api/query"
    )]
    pub query_endpoint: String,

    /// Where MoMo sends the buyer after payment.
    #[arg(
        id = "momo_return_url",
        long = "momo-return-url",
        env = "MOMO_RETURN_URL",
        default_value = "http://localhost:3000/payment/result"
    )]
    pub return_url: String,

    /// Where MoMo posts payment notifications.
    #[arg(
        long = "momo-ipn-url",
        env = "MOMO_IPN_URL",
        default_value = "http://localhost:8080/api/v1/payments/momo/callback"
    )]
    pub ipn_url: String,
}

impl From<MomoArgs> for MomoConfig {
    fn from(args: MomoArgs) -> Self {
        Self {
            partner_code: args.partner_code,
            access_key: args.access_key,
            secret_key: args.secret_key,
            create_endpoint: args.create_endpoint,
            query_endpoint: args.query_endpoint,
            return_url: args.return_url,
            ipn_url: args.ipn_url,
        }
    }
}

/// ZaloPay application credentials and endpoints.
#[derive(Args, Debug, Clone)]
pub struct ZaloPayArgs {
    #[arg(long = "zalopay-app-id", env = "ZALOPAY_APP_ID", default_value_t = 2553)]
    pub app_id: u32,

    /// Signs outbound requests.
    #[arg(long = "zalopay-key1", env = "ZALOPAY_KEY1", default_value = "", hide_env_values = true)]
    pub key1: String,

    /// Verifies inbound callbacks.
    #[arg(long = "zalopay-key2", env = "ZALOPAY_KEY2", default_value = "", hide_env_values = true)]
    pub key2: String,

    #[arg(
        id = "zalopay_create_endpoint",
        long = "zalopay-create-endpoint",
        env = "ZALOPAY_CREATE_ENDPOINT",
        default_value = "https://sb-openapi.zalopay.vn/v2/create"
    )]
    pub create_endpoint: String,

    #[arg(
        id = "zalopay_query_endpoint",
        long = "zalopay-query-endpoint",
        env = "ZALOPAY_QUERY_ENDPOINT",
        default_value = "https://sb-openapi.zalopay.vn/v2/query"
    )]
    pub query_endpoint: String,

    #[arg(
        long = "zalopay-callback-url",
        env = "ZALOPAY_CALLBACK_URL",
        default_value = "http://localhost:8080/api/v1/payments/zalopay/callback"
    )]
    pub callback_url: String,

    #[arg(
        id = "zalopay_return_url",
        long = "zalopay-return-url",
        env = "ZALOPAY_RETURN_URL",
        default_value = "http://localhost:3000/payment/result"
    )]
    pub return_url: String,
}

impl From<ZaloPayArgs> for ZaloPayConfig {
    fn from(args: ZaloPayArgs) -> Self {
        Self {
            app_id: args.app_id,
            key1: args.key1,
            key2: args.key2,
            create_endpoint: args.create_endpoint,
            query_endpoint: args.query_endpoint,
            callback_url: args.callback_url,
            return_url: args.return_url,
        }
    }
}

/// Settings shared by both payment providers.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    #[command(flatten)]
    pub momo: MomoArgs,

    #[command(flatten)]
    pub zalopay: ZaloPayArgs,

    /// Per-request timeout for provider calls, in seconds.
    #[arg(long = "provider-timeout-secs", env = "COURSEPAY_PROVIDER_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Serve even when provider secrets are missing. Callbacks from an
    /// unconfigured provider are still rejected.
    #[arg(long = "allow-missing-provider-secrets", env = "COURSEPAY_ALLOW_MISSING_PROVIDER_SECRETS")]
    pub allow_missing_secrets: bool,
}

impl ProviderArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Environment names of the signing secrets left empty.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        [
            ("MOMO_SECRET_KEY", &self.momo.secret_key),
            ("ZALOPAY_KEY1", &self.zalopay.key1),
            ("ZALOPAY_KEY2", &self.zalopay.key2),
        ]
        .into_iter()
        .filter(|(_, secret)| secret.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Whether both providers have the secrets they need to sign requests.
    pub fn is_configured(&self) -> bool {
        self.missing_secrets().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        providers: ProviderArgs,
    }

    #[test]
    fn test_defaults_point_at_sandboxes() {
        let cli = TestCli::parse_from(["coursepay"]);
        let zalopay: ZaloPayConfig = cli.providers.zalopay.clone().into();
        assert_eq!(zalopay.app_id, 2553);
        assert_eq!(zalopay.create_endpoint, "https://sb-openapi.zalopay.vn/v2/create");
        assert_eq!(cli.providers.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "coursepay",
            "--momo-secret-key",
            "s3cret",
            "--zalopay-key1",
            "k1",
            "--zalopay-key2",
            "k2",
            "--provider-timeout-secs",
            "5",
        ]);
        assert!(cli.providers.is_configured());
        assert!(!cli.providers.allow_missing_secrets);
        let momo: MomoConfig = cli.providers.momo.into();
        assert_eq!(momo.secret_key, "s3cret");
        assert_eq!(cli.providers.timeout_secs, 5);
    }

    #[test]
    fn test_missing_secrets_are_named() {
        let cli = TestCli::parse_from(["coursepay", "--zalopay-key1", "k1"]);
        assert!(!cli.providers.is_configured());
        assert_eq!(
            cli.providers.missing_secrets(),
            vec!["MOMO_SECRET_KEY", "ZALOPAY_KEY2"]
        );

        let cli = TestCli::parse_from(["coursepay", "--allow-missing-provider-secrets"]);
        assert!(cli.providers.allow_missing_secrets);
        assert_eq!(cli.providers.missing_secrets().len(), 3);
    }
}
