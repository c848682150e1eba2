//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                      |
//! |------------|--------------|----------------------------------|
//! | `entropy`  | EntropyPort  | ESP32 hardware RNG               |
//! | `hardware` | ThermalPort  | Thermocouple task, system timer  |
//! |            | DisplayPort  | Touchscreen task                 |
//! | `log_sink` | EventSink    | Serial log output                |
//! | `nvs`      | ConfigPort   | NVS / in-memory store            |
//! |            | StoragePort  |                                  |
//! | `tasks`    |              | Thermocouple, command, display   |
//! |            |              | driver tasks                     |
//! | `time`     |              | ESP32 system timer               |

pub mod entropy;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod tasks;
pub mod time;
