//! Banking capabilities exposed to the agents

use std::sync::Arc;

use serde_json::json;

use crate::banking::directory::CustomerDirectory;
use crate::core::{DeskError, ToolCall, ToolDefinition, ToolResult};
use crate::tools::CapabilityRegistry;

pub const LOOKUP_CUSTOMER: &str = "get_client_master_by_bank_card_number";
pub const UPDATE_ADDRESS: &str = "update_client_master_by_bank_card_number";

fn required(call: &ToolCall, key: &str) -> crate::core::Result<String> {
    call.get_string(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DeskError::capability(format!("missing required argument '{}'", key)))
}

/// Identity verification: fetch the customer master by card number
pub fn verify_identity(directory: Arc<dyn CustomerDirectory>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(
        ToolDefinition::function(
            LOOKUP_CUSTOMER,
            "銀行カード番号をキーとして顧客マスターの情報(氏名、住所、電話番号)を取得します",
            json!({
                "type": "object",
                "properties": {
                    "bankCardNumber": {"type": "string", "description": "銀行カード番号"}
                },
                "required": ["bankCardNumber"]
            }),
        ),
        move |call| {
            let card = required(call, "bankCardNumber")?;
            let record = directory.lookup(&card)?;
            Ok(ToolResult::success_with_data(
                LOOKUP_CUSTOMER,
                record.to_string(),
                serde_json::to_value(&record)?,
            ))
        },
    );
    registry
}

/// Address update on the customer master
pub fn address_update(directory: Arc<dyn CustomerDirectory>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(
        ToolDefinition::function(
            UPDATE_ADDRESS,
            "銀行カード番号をキーとして顧客マスターの住所変更をします",
            json!({
                "type": "object",
                "properties": {
                    "bankCardNumber": {"type": "string", "description": "銀行カード番号"},
                    "newAddress": {"type": "string", "description": "新しい住所"}
                },
                "required": ["bankCardNumber", "newAddress"]
            }),
        ),
        move |call| {
            let card = required(call, "bankCardNumber")?;
            let address = required(call, "newAddress")?;
            let record = directory.update_address(&card, &address)?;
            Ok(ToolResult::success_with_data(
                UPDATE_ADDRESS,
                record.to_string(),
                serde_json::to_value(&record)?,
            ))
        },
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banking::directory::StubDirectory;

    fn stub() -> Arc<dyn CustomerDirectory> {
        Arc::new(StubDirectory::new())
    }

    #[test]
    fn test_lookup_capability() {
        let registry = verify_identity(stub());
        assert_eq!(registry.names(), vec![LOOKUP_CUSTOMER]);

        let result = registry.execute(&ToolCall::new(
            LOOKUP_CUSTOMER,
            json!({"bankCardNumber": "1234"}),
        ));
        assert!(result.success);
        assert!(result.output.contains("港区港南 2-16-3"));
    }

    #[test]
    fn test_update_capability() {
        let registry = address_update(stub());
        let result = registry.execute(&ToolCall::new(
            UPDATE_ADDRESS,
            json!({"bankCardNumber": "1234", "newAddress": "港区港南 9-86-7"}),
        ));
        assert!(result.success);
        assert!(result.output.contains("港区港南 9-86-7"));
    }

    #[test]
    fn test_missing_argument_fails() {
        let registry = address_update(stub());
        let result = registry.execute(&ToolCall::new(
            UPDATE_ADDRESS,
            json!({"bankCardNumber": "1234"}),
        ));
        assert!(!result.success);
        assert!(result.output.contains("newAddress"));
    }
}
