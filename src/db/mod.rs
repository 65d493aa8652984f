pub mod cart_repo;
pub mod models;
pub mod order_repo;
pub mod product_repo;
pub mod review_repo;
pub mod user_repo;
