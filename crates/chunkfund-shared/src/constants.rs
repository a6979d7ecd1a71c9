/// Application name
pub const APP_NAME: &str = "chunkfund";

/// Price of one chunk of an invoice, in baht
pub const CHUNK_PRICE: f64 = 100.0;

/// Share of the profit margin collected by the platform on settlement (10%)
pub const PLATFORM_FEE_RATE: f64 = 0.10;

/// Amounts at or below this are treated as rounding noise
pub const DUST_THRESHOLD: f64 = 0.01;

/// Username of the reserved fee-collecting user
pub const PLATFORM_OWNER_USERNAME: &str = "PLATFORM OWNER";

/// Currency symbol used when rendering amounts
pub const CURRENCY_SYMBOL: &str = "฿";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default database file, relative to the working directory
pub const DEFAULT_DATABASE_FILE: &str = "invoice.db";

/// Header carrying the acting user's id on every API request
pub const ACTING_USER_HEADER: &str = "x-user-id";
