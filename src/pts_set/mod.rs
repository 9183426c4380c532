pub mod points_to;
