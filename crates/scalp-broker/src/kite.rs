//! Zerodha Kite Connect REST broker.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use scalp_core::error::BrokerError;
use scalp_core::traits::Broker;
use scalp_core::types::{BrokerOrder, BrokerPosition, OrderId, OrderSide, OrderStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Kite Connect API configuration.
#[derive(Debug, Clone)]
pub struct KiteConfig {
    pub api_key: String,
    pub access_token: String,
    pub base_url: String,
}

impl KiteConfig {
    pub fn new(api_key: String, access_token: String, base_url: String) -> Self {
        Self {
            api_key,
            access_token,
            base_url,
        }
    }

    /// Load credentials from the named environment variables.
    pub fn from_env(
        api_key_env: &str,
        access_token_env: &str,
        base_url: &str,
    ) -> Result<Self, BrokerError> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| BrokerError::Configuration(format!("{api_key_env} not set")))?;
        let access_token = std::env::var(access_token_env)
            .map_err(|_| BrokerError::Configuration(format!("{access_token_env} not set")))?;
        Ok(Self::new(api_key, access_token, base_url.to_string()))
    }
}

/// Kite API response types
#[derive(Debug, Deserialize)]
struct KiteEnvelope<T> {
    status: String,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiteOrderId {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct KiteTriggerId {
    trigger_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct KiteOrderRow {
    order_id: String,
    tradingsymbol: String,
    transaction_type: String,
    status: String,
    average_price: Option<f64>,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct KitePositionRow {
    tradingsymbol: String,
    quantity: i64,
    average_price: f64,
    pnl: f64,
}

#[derive(Debug, Deserialize)]
struct KitePositions {
    net: Vec<KitePositionRow>,
}

/// Kite Connect broker client.
///
/// Buys go in as regular NRML market orders; the protective exit is a
/// two-leg (OCO) GTT trigger whose legs are limit sells priced slightly
/// below the trigger so they cross immediately.
pub struct KiteBroker {
    config: KiteConfig,
    client: Client,
}

const EXCHANGE: &str = "NFO";
const PRODUCT: &str = "NRML";
// Limit-price buffers below the GTT triggers, so the leg fills at market.
const SL_LIMIT_FACTOR: f64 = 0.995;
const TP_LIMIT_FACTOR: f64 = 0.997;

impl KiteBroker {
    pub fn new(config: KiteConfig) -> Result<Self, BrokerError> {
        let mut headers = header::HeaderMap::new();
        let auth = format!("token {}:{}", config.api_key, config.access_token);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );
        headers.insert("X-Kite-Version", header::HeaderValue::from_static("3"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn check<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, BrokerError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(BrokerError::RateLimited {
                    retry_after_secs: 1,
                })
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(BrokerError::AuthenticationError(body))
            }
            s if !s.is_success() => return Err(BrokerError::ApiError(format!("{s}: {body}"))),
            _ => {}
        }

        let envelope: KiteEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| BrokerError::MalformedResponse(format!("{e}: {body}")))?;

        if envelope.status != "success" {
            return Err(BrokerError::OrderRejected(
                envelope.message.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        envelope
            .data
            .ok_or_else(|| BrokerError::MalformedResponse("missing data field".to_string()))
    }

    async fn place_regular(
        &self,
        symbol: &str,
        qty: i64,
        transaction_type: &str,
    ) -> Result<OrderId, BrokerError> {
        let resp = self
            .client
            .post(self.url("/orders/regular"))
            .form(&[
                ("tradingsymbol", symbol),
                ("exchange", EXCHANGE),
                ("transaction_type", transaction_type),
                ("order_type", "MARKET"),
                ("quantity", &qty.to_string()),
                ("product", PRODUCT),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        let data: KiteOrderId = Self::check(resp).await?;
        Ok(data.order_id)
    }

    fn parse_status(raw: &str) -> OrderStatus {
        match raw {
            "COMPLETE" => OrderStatus::Complete,
            "CANCELLED" | "EXPIRED" => OrderStatus::Cancelled,
            "REJECTED" => OrderStatus::Rejected,
            _ => OrderStatus::Open,
        }
    }
}

#[async_trait]
impl Broker for KiteBroker {
    async fn place_market_buy(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let order_id = self.place_regular(symbol, qty, "BUY").await?;
        info!(symbol, qty, order_id, "buy order placed");
        Ok(order_id)
    }

    async fn fill_price(&self, order_id: &str) -> Result<Option<Decimal>, BrokerError> {
        let orders = self.orders().await?;
        // A just-placed order can lag the order book; treat absence as
        // not-yet-filled rather than an error.
        Ok(orders
            .iter()
            .find(|o| o.order_id == order_id)
            .and_then(|o| o.avg_price.filter(|p| !p.is_zero())))
    }

    async fn place_oco_exit(
        &self,
        symbol: &str,
        qty: i64,
        stop: Decimal,
        target: Decimal,
    ) -> Result<OrderId, BrokerError> {
        use rust_decimal::prelude::ToPrimitive;

        let stop_f = stop.to_f64().unwrap_or(0.0);
        let target_f = target.to_f64().unwrap_or(0.0);
        let sl_limit = (stop_f * SL_LIMIT_FACTOR * 100.0).round() / 100.0;
        let tp_limit = (target_f * TP_LIMIT_FACTOR * 100.0).round() / 100.0;

        let condition = json!({
            "exchange": EXCHANGE,
            "tradingsymbol": symbol,
            "trigger_values": [stop_f, target_f],
            "last_price": target_f,
        });
        let leg = |price: f64| {
            json!({
                "exchange": EXCHANGE,
                "tradingsymbol": symbol,
                "transaction_type": "SELL",
                "quantity": qty,
                "order_type": "LIMIT",
                "product": PRODUCT,
                "price": price,
            })
        };
        let orders = json!([leg(sl_limit), leg(tp_limit)]);

        let resp = self
            .client
            .post(self.url("/gtt/triggers"))
            .form(&[
                ("type", "two-leg"),
                ("condition", &condition.to_string()),
                ("orders", &orders.to_string()),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        let data: KiteTriggerId = Self::check(resp).await?;
        // The API returns the trigger id as a bare number.
        let trigger_id = match data.trigger_id {
            serde_json::Value::String(s) => s,
            v => v.to_string(),
        };
        info!(
            symbol,
            qty,
            trigger_id,
            stop = stop_f,
            target = target_f,
            "protective OCO placed"
        );
        Ok(trigger_id)
    }

    async fn place_market_exit(&self, symbol: &str, qty: i64) -> Result<OrderId, BrokerError> {
        let order_id = self.place_regular(symbol, qty, "SELL").await?;
        warn!(symbol, qty, order_id, "market exit placed");
        Ok(order_id)
    }

    async fn positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        let resp = self
            .client
            .get(self.url("/portfolio/positions"))
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        let data: KitePositions = Self::check(resp).await?;
        data.net
            .into_iter()
            .map(|p| {
                Ok(BrokerPosition {
                    symbol: p.tradingsymbol,
                    qty: p.quantity,
                    avg_price: Decimal::from_f64_retain(p.average_price).ok_or_else(|| {
                        BrokerError::MalformedResponse("bad average_price".to_string())
                    })?,
                    pnl: Decimal::from_f64_retain(p.pnl)
                        .ok_or_else(|| BrokerError::MalformedResponse("bad pnl".to_string()))?,
                })
            })
            .collect()
    }

    async fn orders(&self) -> Result<Vec<BrokerOrder>, BrokerError> {
        let resp = self
            .client
            .get(self.url("/orders"))
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        let rows: Vec<KiteOrderRow> = Self::check(resp).await?;
        Ok(rows
            .into_iter()
            .map(|o| BrokerOrder {
                order_id: o.order_id,
                symbol: o.tradingsymbol,
                side: if o.transaction_type == "SELL" {
                    OrderSide::Sell
                } else {
                    OrderSide::Buy
                },
                status: Self::parse_status(&o.status),
                avg_price: o.average_price.and_then(Decimal::from_f64_retain),
                qty: o.quantity,
            })
            .collect())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let resp = self
            .client
            .delete(self.url(&format!("/orders/regular/{order_id}")))
            .send()
            .await
            .map_err(|e| BrokerError::NetworkError(e.to_string()))?;

        let _: KiteOrderId = Self::check(resp).await?;
        info!(order_id, "order cancelled");
        Ok(())
    }

    fn name(&self) -> &str {
        "kite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_mapping() {
        assert_eq!(KiteBroker::parse_status("COMPLETE"), OrderStatus::Complete);
        assert_eq!(KiteBroker::parse_status("REJECTED"), OrderStatus::Rejected);
        assert_eq!(KiteBroker::parse_status("CANCELLED"), OrderStatus::Cancelled);
        assert_eq!(
            KiteBroker::parse_status("TRIGGER PENDING"),
            OrderStatus::Open
        );
        assert_eq!(KiteBroker::parse_status("OPEN"), OrderStatus::Open);
    }

    #[test]
    fn envelope_parses_order_id() {
        let body = r#"{"status":"success","data":{"order_id":"240829000001"}}"#;
        let env: KiteEnvelope<KiteOrderId> = serde_json::from_str(body).unwrap();
        assert_eq!(env.status, "success");
        assert_eq!(env.data.unwrap().order_id, "240829000001");
    }

    #[test]
    fn position_rows_parse() {
        let body = r#"{"net":[{"tradingsymbol":"NIFTY2490124500CE","quantity":0,"average_price":101.5,"pnl":-120.0}]}"#;
        let pos: KitePositions = serde_json::from_str(body).unwrap();
        assert!(pos.net[0].quantity == 0);
    }
}
