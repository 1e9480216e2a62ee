//! # Ledger Runtime
//!
//! Stands up a [`Bank`] from a [`NodeConfig`], backed by the in-memory
//! transfer agent and a static price source, and executes scripted
//! [`Operation`]s against it one at a time.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use strongbox_contracts::{Bank, Collaborators, LedgerSnapshot};
use strongbox_protocol::error::LedgerError;
use strongbox_protocol::events::LedgerEvent;
use strongbox_protocol::oracle::StaticPriceSource;
use strongbox_protocol::primitives::{amount_str, Asset};
use strongbox_protocol::transfer::LocalTransferAgent;

use crate::script::Operation;
use crate::settings::NodeConfig;

/// Result of one scripted step, printed as one JSON line.
#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    /// Events the step appended, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<LedgerEvent>,
    /// Query result, if the step was a query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

/// Final report of a run, printed after the per-step lines.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub snapshot: LedgerSnapshot,
    /// Native value held by the ledger's custody account, in wei.
    #[serde(with = "amount_str")]
    pub custody: u128,
    pub rejected: usize,
}

/// A ledger plus the simulated outside world around it.
pub struct Runtime {
    bank: Arc<Bank>,
    agent: Arc<LocalTransferAgent>,
}

impl Runtime {
    /// Builds the ledger, enrolls users, registers assets and seeds the
    /// agent's wallets, approvals and the price source.
    pub fn from_config(config: &NodeConfig) -> Result<Self, LedgerError> {
        let agent = Arc::new(LocalTransferAgent::new());
        let prices = Arc::new(StaticPriceSource::new());
        for (asset, price) in &config.prices {
            prices.set_price(*asset, *price);
        }

        let bank = Bank::new(
            config.deployer,
            config.ledger.clone(),
            Collaborators::local(agent.clone(), prices),
        )?;
        let deployer = config.deployer;
        for user in &config.users {
            bank.add_user(&deployer, *user)?;
        }
        for asset in &config.assets {
            bank.register_asset(&deployer, asset.address, asset.decimals)?;
            if !asset.enabled {
                bank.set_asset_enabled(&deployer, &asset.address, false)?;
            }
        }

        for wallet in &config.wallets {
            agent.fund(wallet.asset, wallet.owner, wallet.amount);
        }
        for approval in &config.approvals {
            agent.approve(approval.token, approval.owner, approval.amount);
        }

        info!(
            %deployer,
            users = config.users.len(),
            assets = config.assets.len(),
            wallets = config.wallets.len(),
            "runtime ready"
        );
        Ok(Self {
            bank: Arc::new(bank),
            agent,
        })
    }

    pub fn bank(&self) -> &Arc<Bank> {
        &self.bank
    }

    pub fn agent(&self) -> &Arc<LocalTransferAgent> {
        &self.agent
    }

    /// Snapshot of the ledger and custody after a run.
    pub fn summary(&self, rejected: usize) -> RunSummary {
        RunSummary {
            snapshot: self.bank.snapshot(),
            custody: self.agent.custody_balance(Asset::Native),
            rejected,
        }
    }

    /// Runs one step and reports what happened.
    pub fn execute(&self, index: usize, op: &Operation) -> Outcome {
        let before = self.bank.last_sequence();
        let result = self.apply(op);
        let events = self.bank.events_since(before);

        match result {
            Ok(value) => Outcome {
                index,
                op: op.name(),
                ok: true,
                events,
                value,
                error: None,
                error_kind: None,
            },
            Err(err) => Outcome {
                index,
                op: op.name(),
                ok: false,
                events,
                value: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
            },
        }
    }

    fn apply(&self, op: &Operation) -> Result<Option<Value>, LedgerError> {
        let bank = &self.bank;
        match op {
            Operation::Deposit { principal, amount } => {
                self.agent
                    .deliver_native(*principal, *amount, || bank.deposit(principal, *amount))?;
            }
            Operation::Receive { principal, amount } => {
                self.agent.deliver_native(*principal, *amount, || {
                    bank.receive_unsolicited(principal, *amount)
                })?;
            }
            Operation::Withdraw { principal, amount } => {
                bank.withdraw(principal, *amount)?;
            }
            Operation::DepositToken {
                principal,
                token,
                amount,
                decimals,
            } => {
                bank.deposit_token(principal, token, *amount, *decimals)?;
            }
            Operation::WithdrawToken {
                principal,
                token,
                amount,
            } => {
                bank.withdraw_token(principal, token, *amount)?;
            }
            Operation::UpdateWithdrawLimit { caller, limit } => {
                bank.update_withdraw_limit(caller, *limit)?;
            }
            Operation::GrantRole {
                caller,
                role,
                target,
            } => {
                bank.grant_role(caller, *role, *target)?;
            }
            Operation::RevokeRole {
                caller,
                role,
                target,
            } => {
                bank.revoke_role(caller, *role, target)?;
            }
            Operation::AddUser { caller, target } => {
                bank.add_user(caller, *target)?;
            }
            Operation::RemoveUser { caller, target } => {
                bank.remove_user(caller, target)?;
            }
            Operation::RegisterAsset {
                caller,
                token,
                decimals,
            } => {
                bank.register_asset(caller, *token, *decimals)?;
            }
            Operation::SetAssetEnabled {
                caller,
                token,
                enabled,
            } => {
                bank.set_asset_enabled(caller, token, *enabled)?;
            }
            Operation::Balance { principal, asset } => {
                let balance = match asset {
                    Asset::Native => bank.balance_of(principal),
                    Asset::Token(token) => bank.token_balance_of(principal, token),
                };
                return Ok(Some(Value::String(balance.to_string())));
            }
            Operation::Price { asset } => {
                let price = bank.get_reference_price(asset)?;
                return Ok(Some(json!({
                    "value": price.value.to_string(),
                    "decimals": price.decimals,
                })));
            }
            Operation::Quote { amount } => {
                let quote = bank.quote_native(*amount)?;
                return Ok(Some(Value::String(quote.to_string())));
            }
            Operation::Fund {
                owner,
                asset,
                amount,
            } => self.agent.fund(*asset, *owner, *amount),
            Operation::Approve {
                owner,
                token,
                amount,
            } => self.agent.approve(*token, *owner, *amount),
            Operation::SetReverting {
                principal,
                reverting,
            } => self.agent.set_reverting(*principal, *reverting),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;
    use strongbox_protocol::config::ONE_NATIVE;
    use strongbox_protocol::primitives::Address;

    const CONFIG: &str = r#"
        deployer = "0x0000000000000000000000000000000000000001"
        users = ["0x00000000000000000000000000000000000000a1"]

        [ledger]
        bank_cap = "1_000_000_000_000"
        withdraw_limit = "1_000_000_000_000_000_000"

        [[assets]]
        address = "0x00000000000000000000000000000000000000ee"
        decimals = 6

        [prices]
        native = { value = "250000000000", decimals = 8 }

        [[wallets]]
        owner = "0x00000000000000000000000000000000000000a1"
        asset = "native"
        amount = "5_000_000_000_000_000_000"
    "#;

    const ALICE: Address = Address::from_low_u8(0xa1);

    fn runtime() -> Runtime {
        Runtime::from_config(&NodeConfig::from_toml_str(CONFIG).unwrap()).unwrap()
    }

    fn run(rt: &Runtime, text: &str) -> Vec<Outcome> {
        script::parse(text)
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, op)| rt.execute(i, op))
            .collect()
    }

    #[test]
    fn bootstrap_applies_config() {
        let rt = runtime();
        assert!(rt.bank().has_role(&ALICE, strongbox_protocol::access::Role::User));
        assert_eq!(
            rt.bank().asset_info(&Address::from_low_u8(0xee)).unwrap().decimals,
            6
        );
        assert_eq!(rt.agent().wallet_balance(Asset::Native, &ALICE), 5 * ONE_NATIVE);
    }

    #[test]
    fn deposit_withdraw_and_failure_reporting() {
        let rt = runtime();
        let outcomes = run(
            &rt,
            r#"[
                { "op": "deposit", "principal": "0x00000000000000000000000000000000000000a1", "amount": "2_000_000_000_000_000_000" },
                { "op": "withdraw", "principal": "0x00000000000000000000000000000000000000a1", "amount": "2_000_000_000_000_000_000" },
                { "op": "set_reverting", "principal": "0x00000000000000000000000000000000000000a1", "reverting": true },
                { "op": "withdraw", "principal": "0x00000000000000000000000000000000000000a1", "amount": "1_000_000_000_000_000_000" },
                { "op": "balance", "principal": "0x00000000000000000000000000000000000000a1" },
                { "op": "quote", "amount": "1_000_000_000_000_000_000" }
            ]"#,
        );

        assert!(outcomes[0].ok);
        assert_eq!(outcomes[0].events.len(), 1);
        assert_eq!(outcomes[1].error_kind, Some("invalid_withdrawal"));
        assert!(outcomes[1].events.is_empty());
        assert!(outcomes[2].ok);
        assert_eq!(outcomes[3].error_kind, Some("transfer_failed"));
        assert_eq!(
            outcomes[4].value,
            Some(Value::String((2 * ONE_NATIVE).to_string()))
        );
        assert_eq!(outcomes[5].value, Some(Value::String("2500000000".into())));
    }

    #[test]
    fn rejected_push_returns_value_to_wallet() {
        let rt = runtime();
        let outcomes = run(
            &rt,
            r#"[
                { "op": "fund", "owner": "0x00000000000000000000000000000000000000b2", "asset": "native", "amount": 100 },
                { "op": "receive", "principal": "0x00000000000000000000000000000000000000b2", "amount": 100 }
            ]"#,
        );
        assert_eq!(outcomes[1].error_kind, Some("unauthorized"));
        assert_eq!(
            rt.agent()
                .wallet_balance(Asset::Native, &Address::from_low_u8(0xb2)),
            100
        );
    }

    #[test]
    fn summary_reports_balances_beyond_u64() {
        let config = CONFIG
            .replace(
                r#"withdraw_limit = "1_000_000_000_000_000_000""#,
                r#"withdraw_limit = "50_000_000_000_000_000_000""#,
            )
            .replace(
                r#"amount = "5_000_000_000_000_000_000""#,
                r#"amount = "120_000_000_000_000_000_000""#,
            );
        let rt = Runtime::from_config(&NodeConfig::from_toml_str(&config).unwrap()).unwrap();
        let outcomes = run(
            &rt,
            r#"[
                { "op": "deposit", "principal": "0x00000000000000000000000000000000000000a1", "amount": "100_000_000_000_000_000_000" }
            ]"#,
        );
        assert!(outcomes[0].ok);
        let event = serde_json::to_value(&outcomes[0]).unwrap();
        assert_eq!(event["events"][0]["amount"], "100000000000000000000");

        let json = serde_json::to_value(rt.summary(0)).unwrap();
        assert_eq!(json["custody"], "100000000000000000000");
        assert_eq!(json["rejected"], 0);
        assert_eq!(
            json["snapshot"]["accounts"][ALICE.to_hex()]["native"],
            "100000000000000000000"
        );
        assert_eq!(json["snapshot"]["withdraw_limit"], "50000000000000000000");
    }

    #[test]
    fn outcome_json_omits_empty_fields() {
        let rt = runtime();
        let outcome = rt.execute(
            0,
            &Operation::Balance {
                principal: ALICE,
                asset: Asset::Native,
            },
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["op"], "balance");
        assert_eq!(json["value"], "0");
        assert!(json.get("events").is_none());
        assert!(json.get("error").is_none());
    }
}
