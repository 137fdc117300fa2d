//! Price alerts
//!
//! CRUD over the store plus per-tick evaluation. The feed hands every fresh
//! snapshot to `evaluate`, which flips satisfied alerts from Active to
//! Triggered (one-way, no re-arming) and pushes the trigger onto the bus.

use crate::notifications::NotificationHub;
use crate::store::AccountRepository;
use chrono::Utc;
use paper_core::{
    AlertDirection, AlertStatus, EngineError, EngineResult, PriceAlert, PriceSnapshot,
    ServerMessage, SubscriptionKey,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Price alert service
pub struct AlertService {
    store: Arc<dyn AccountRepository>,
    hub: Arc<NotificationHub>,
}

impl AlertService {
    /// Create a new alert service
    pub fn new(store: Arc<dyn AccountRepository>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// Create an alert for an account
    pub fn create(
        &self,
        account_id: &str,
        symbol: &str,
        target_price: Decimal,
        direction: AlertDirection,
    ) -> EngineResult<PriceAlert> {
        if target_price <= Decimal::ZERO {
            return Err(EngineError::invalid_parameter(
                "target price must be positive",
            ));
        }
        let account = self
            .store
            .get_account(account_id)?
            .ok_or_else(|| EngineError::account_not_found(account_id))?;

        let alert = PriceAlert {
            id: Uuid::new_v4().to_string(),
            account_id: account.id,
            symbol: symbol.to_string(),
            target_price,
            direction,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            triggered_at: None,
        };
        self.store.insert_alert(&alert)?;
        info!(
            "Created alert {} for {}: {} {} {}",
            alert.id,
            alert.account_id,
            alert.symbol,
            alert.direction.as_str(),
            alert.target_price
        );
        Ok(alert)
    }

    /// All alerts for an account, newest first
    pub fn alerts_for(&self, account_id: &str) -> EngineResult<Vec<PriceAlert>> {
        Ok(self.store.alerts_for(account_id)?)
    }

    /// Delete an alert; `OrderNotFound`-style miss maps to a boolean instead
    pub fn delete(&self, alert_id: &str) -> EngineResult<bool> {
        Ok(self.store.delete_alert(alert_id)?)
    }

    /// Evaluate all active alerts against a snapshot
    ///
    /// Returns how many alerts fired. Symbols missing from the snapshot are
    /// skipped and stay active.
    pub fn evaluate(&self, snapshot: &PriceSnapshot) -> EngineResult<usize> {
        let active = self.store.active_alerts()?;
        let mut triggered = 0;

        for mut alert in active {
            let Some(price) = snapshot.price_of(&alert.symbol) else {
                continue;
            };
            if !alert.is_satisfied_by(price) {
                continue;
            }

            alert.status = AlertStatus::Triggered;
            alert.triggered_at = Some(Utc::now());
            if let Err(e) = self.store.update_alert(&alert) {
                warn!("Failed to persist trigger for alert {}: {}", alert.id, e);
                continue;
            }

            info!(
                "Alert {} triggered: {} {} {} (price {})",
                alert.id,
                alert.symbol,
                alert.direction.as_str(),
                alert.target_price,
                price
            );
            self.hub.publish(
                SubscriptionKey::alerts(alert.account_id.clone()),
                ServerMessage::AlertTriggered { alert },
            );
            triggered += 1;
        }

        Ok(triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteAccountStore;
    use paper_core::{Account, PricePoint, SnapshotSource};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn service_with_account() -> AlertService {
        let store = Arc::new(SqliteAccountStore::new_in_memory().unwrap());
        store
            .insert_account(&Account::new("acct-1", dec!(10000)))
            .unwrap();
        AlertService::new(store, Arc::new(NotificationHub::new()))
    }

    fn snapshot_with(symbol: &str, price: Decimal) -> PriceSnapshot {
        let mut prices = HashMap::new();
        prices.insert(
            symbol.to_string(),
            PricePoint {
                symbol: symbol.to_string(),
                pair: format!("{}/USDT", symbol),
                price,
                change_24h: Decimal::ZERO,
                volume_24h: None,
                market_cap: None,
                updated_at: Utc::now(),
            },
        );
        PriceSnapshot {
            prices,
            source: SnapshotSource::Live,
            refreshed_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_rejects_bad_target() {
        let service = service_with_account();
        assert!(matches!(
            service.create("acct-1", "BTC", dec!(0), AlertDirection::Above),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            service.create("ghost", "BTC", dec!(1), AlertDirection::Above),
            Err(EngineError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_evaluate_triggers_once() {
        let service = service_with_account();
        service
            .create("acct-1", "BTC", dec!(60000), AlertDirection::Above)
            .unwrap();

        // Below target: stays active
        let fired = service
            .evaluate(&snapshot_with("BTC", dec!(59000)))
            .unwrap();
        assert_eq!(fired, 0);

        // At/above target: fires exactly once
        let fired = service
            .evaluate(&snapshot_with("BTC", dec!(61000)))
            .unwrap();
        assert_eq!(fired, 1);

        // One-way transition; second pass finds nothing active
        let fired = service
            .evaluate(&snapshot_with("BTC", dec!(62000)))
            .unwrap();
        assert_eq!(fired, 0);

        let alerts = service.alerts_for("acct-1").unwrap();
        assert_eq!(alerts[0].status, AlertStatus::Triggered);
        assert!(alerts[0].triggered_at.is_some());
    }

    #[test]
    fn test_below_direction_and_missing_symbol() {
        let service = service_with_account();
        service
            .create("acct-1", "ETH", dec!(3000), AlertDirection::Below)
            .unwrap();

        // Snapshot without the symbol: skipped, stays active
        let fired = service
            .evaluate(&snapshot_with("BTC", dec!(1000)))
            .unwrap();
        assert_eq!(fired, 0);

        let fired = service
            .evaluate(&snapshot_with("ETH", dec!(2900)))
            .unwrap();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_trigger_is_published() {
        let service = service_with_account();
        let mut rx = service.hub.receiver();
        service
            .create("acct-1", "BTC", dec!(50000), AlertDirection::Above)
            .unwrap();
        service
            .evaluate(&snapshot_with("BTC", dec!(55000)))
            .unwrap();

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.key, SubscriptionKey::alerts("acct-1"));
        assert!(matches!(msg.message, ServerMessage::AlertTriggered { .. }));
    }
}
