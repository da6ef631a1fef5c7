mod handlers;
mod types;

pub use handlers::{get_nearest_reading, get_sensor_history, list_sensors};
pub use types::{HistoryFormat, HistoryQuery, HistoryResponse, NearestQuery};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_get_nearest_reading, __path_get_sensor_history, __path_list_sensors};
