use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Money account (wallet, bank account, card)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub balance: f64,
  pub currency: Option<String>,
  /// Fields this client does not model, kept verbatim
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Income or expense movement on an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  pub id: String,
  pub account_id: String,
  pub amount: f64,
  pub description: Option<String>,
  /// ISO 8601 date
  pub date: Option<String>,
  pub category_id: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Customer, supplier or patient contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id: String,
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}
