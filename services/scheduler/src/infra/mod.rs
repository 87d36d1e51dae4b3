pub mod db;
pub mod delivery;
pub mod links;
pub mod pacer;
pub mod renderer;
