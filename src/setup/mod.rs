pub mod db_setup;
pub mod demo_seed;
