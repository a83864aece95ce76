// Persistence gateway protocol: request/response bodies and REST routes.

pub mod pages;
pub mod routes;
