pub mod ledger_service;
pub mod region_service;
pub mod subscriber_service;
