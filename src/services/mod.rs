pub mod auth_service;
pub mod bucket_service;
pub mod client;
pub mod derivative_service;
pub mod object_service;

#[cfg(test)]
pub(crate) mod test_support;
