//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements              | Connects to                    |
//! |------------|-------------------------|--------------------------------|
//! | `sim`      | SystemPort, ButtonPort  | Host simulation of the board   |
//! |            | UltrasoundPort          | (timers, echo capture, edges)  |
//! |            | DisplayPort, BuzzerPort |                                |
//! | `pwm`      | (drivers)               | embedded-hal PWM / input pins  |
//! | `log_sink` | EventSink               | `log` facade                   |

pub mod log_sink;
pub mod pwm;
pub mod sim;
