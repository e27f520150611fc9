pub mod collision; // Circle/circle and circle/wall timing + elastic response
pub mod config;
pub mod control_loop;
pub mod controller;
pub mod debug_flags; // Debug output gating (env-based)
pub mod geometry;
pub mod path_planner;
pub mod physics_constants;
pub mod puck_prediction; // Reflected straight-line puck projection
pub mod puck_simulation; // Closed-loop table simulator (puck, opponent, noisy tracker)
pub mod steering; // Speed/acceleration limiter shared by the controllers
pub mod strategy;
pub mod table;
pub mod telemetry;
pub mod timestep;
pub mod trajectory;
pub mod types;
pub mod world_model;
