/// Server endpoint a queue entry is submitted to.
///
/// Collections with a dedicated sync route map to their own variant; every
/// other collection goes through the generic processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEndpoint {
  Transactions,
  Contacts,
  Accounts,
  OpticalRxs,
  CommercialOrders,
  Goals,
  /// Catch-all processor for collections without a dedicated route
  Generic,
}

impl SyncEndpoint {
  /// Resolve the endpoint for a collection name.
  pub fn for_collection(collection: &str) -> Self {
    match collection {
      "transactions" => Self::Transactions,
      "contacts" => Self::Contacts,
      "accounts" => Self::Accounts,
      "opticalRxs" => Self::OpticalRxs,
      "commercialOrders" => Self::CommercialOrders,
      "goals" => Self::Goals,
      // TODO: serviceOrders, patients and appointments still go through the
      // generic processor until the backend grows dedicated sync routes.
      _ => Self::Generic,
    }
  }

  /// Path relative to the API origin.
  pub fn path(&self) -> &'static str {
    match self {
      Self::Transactions => "/api/transactions/sync",
      Self::Contacts => "/api/contacts/sync",
      Self::Accounts => "/api/accounts/sync",
      Self::OpticalRxs => "/api/optical-rxs/sync",
      Self::CommercialOrders => "/api/orders/sync",
      Self::Goals => "/api/goals/sync",
      Self::Generic => "/api/sync/process",
    }
  }
}
