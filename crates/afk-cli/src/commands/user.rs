//! Panel user provisioning and balances.

use std::io::Write;

use afk_core::{CreditsLedger, CurrencyFormatter, UserId};
use afk_db::Panel;
use afk_engine::{ApiResponse, EngineError};
use anyhow::Result;
use serde::Serialize;

use super::util::print_response;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAdded {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub user_id: UserId,
    pub balance: i64,
    pub formatted: String,
}

pub fn add<W: Write>(writer: &mut W, panel: &Panel, user: i64, name: &str) -> Result<bool> {
    let result = (|| -> Result<UserAdded, EngineError> {
        let user_id = UserId::new(user)?;
        panel.add_user(user_id, name)?;
        Ok(UserAdded {
            user_id,
            name: name.to_string(),
        })
    })();
    print_response(writer, &ApiResponse::from_result(result))
}

pub fn balance<W: Write>(
    writer: &mut W,
    panel: &Panel,
    formatter: &dyn CurrencyFormatter,
    user: i64,
) -> Result<bool> {
    let result = (|| -> Result<Balance, EngineError> {
        let user_id = UserId::new(user)?;
        let balance = panel.balance(user_id)?;
        Ok(Balance {
            user_id,
            balance,
            formatted: formatter.format(balance),
        })
    })();
    print_response(writer, &ApiResponse::from_result(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use afk_core::PlainFormatter;

    #[test]
    fn add_then_balance() {
        let panel = Panel::open_in_memory().unwrap();
        let mut out = Vec::new();
        assert!(add(&mut out, &panel, 7, "dora").unwrap());
        panel.add_credits(UserId::new(7).unwrap(), 12);

        let mut out = Vec::new();
        let formatter = PlainFormatter::new("$", "");
        assert!(balance(&mut out, &panel, &formatter, 7).unwrap());
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["data"]["balance"], 12);
        assert_eq!(json["data"]["formatted"], "$12");
    }

    #[test]
    fn add_rejects_non_positive_ids() {
        let panel = Panel::open_in_memory().unwrap();
        let mut out = Vec::new();
        assert!(!add(&mut out, &panel, 0, "nobody").unwrap());
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }
}
