pub mod auth_service;
pub mod auth_service_impl;
pub mod loan_service;
pub mod loan_service_impl;
pub mod query_service;
