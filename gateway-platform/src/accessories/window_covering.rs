//! Window covering (shades, blinds)
//!
//! Status topics, where `<prefix>` is the entry's `topic` field or its id:
//!
//! | Topic | Value |
//! |---|---|
//! | `<prefix>:WindowCovering:CurrentPosition` | 0-100 |
//! | `<prefix>:WindowCovering:TargetPosition` | 0-100 |
//! | `<prefix>:WindowCovering:PositionState` | 0 closing, 1 opening, 2 stopped |
//!
//! Moving the covering sends `<prefix>:WindowCovering:SetTargetPosition:<0-100>*`.

use event_bus::{HandlerError, Subscription};
use gateway_protocol::{Command, StatusValue};
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

use crate::accessory::AccessoryHandle;
use crate::command::CommandSender;
use crate::handler::{AccessoryHandler, HandlerContext, HandlerFactory};
use crate::identity::AccessoryIdentity;

pub const DEVICE_TYPE: &str = "WindowCovering";

const CURRENT_POSITION: &str = "CurrentPosition";
const TARGET_POSITION: &str = "TargetPosition";
const POSITION_STATE: &str = "PositionState";
const SET_TARGET_POSITION: &str = "SetTargetPosition";

/// Direction the covering is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    Decreasing,
    Increasing,
    #[default]
    Stopped,
}

impl PositionState {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(PositionState::Decreasing),
            1 => Some(PositionState::Increasing),
            2 => Some(PositionState::Stopped),
            _ => None,
        }
    }
}

/// Latest reported state of a covering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoveringState {
    pub current_position: Option<u8>,
    pub target_position: Option<u8>,
    pub position_state: PositionState,
}

/// Handler for one window covering
pub struct WindowCovering {
    identity: AccessoryIdentity,
    prefix: String,
    state: Arc<Mutex<CoveringState>>,
    commands: CommandSender,
    subscriptions: Vec<Subscription>,
}

impl WindowCovering {
    /// Bind to `accessory` and subscribe to its status topics
    pub fn new(
        context: &HandlerContext,
        accessory: &AccessoryHandle,
    ) -> Result<Self, HandlerError> {
        let (identity, prefix) = {
            let accessory = accessory.read();
            let entry = accessory.device().ok_or_else(|| {
                HandlerError::failed(format!(
                    "accessory {} has no device entry",
                    accessory.identity
                ))
            })?;
            let prefix = match entry.field("topic") {
                Some(Value::String(topic)) => topic.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => entry.id.to_string(),
            };
            (accessory.identity, prefix)
        };

        // The prefix becomes the first field of every command
        Command::new([prefix.as_str(), DEVICE_TYPE, SET_TARGET_POSITION, "0"]).map_err(|e| {
            HandlerError::failed(format!("invalid topic prefix '{}': {}", prefix, e))
        })?;

        let state = Arc::new(Mutex::new(CoveringState::default()));
        let mut covering = Self {
            identity,
            prefix,
            state,
            commands: context.commands.clone(),
            subscriptions: Vec::with_capacity(3),
        };

        covering.watch(context, CURRENT_POSITION, |state, value| {
            state.current_position = Some(clamp_position(value));
        });
        covering.watch(context, TARGET_POSITION, |state, value| {
            state.target_position = Some(clamp_position(value));
        });
        covering.watch(context, POSITION_STATE, |state, value| {
            if let Some(position_state) = PositionState::from_value(value) {
                state.position_state = position_state;
            }
        });

        info!(identity = %covering.identity, prefix = %covering.prefix, "Window covering ready");
        Ok(covering)
    }

    fn watch<F>(&mut self, context: &HandlerContext, characteristic: &'static str, apply: F)
    where
        F: Fn(&mut CoveringState, i64) + Send + Sync + 'static,
    {
        let state = Arc::clone(&self.state);
        let topic = self.topic(characteristic);
        let subscription = context.bus.subscribe(topic.clone(), move |value: &StatusValue| {
            match value.as_i64() {
                Some(value) => {
                    apply(&mut state.lock(), value);
                    debug!(%topic, value, "Window covering updated");
                }
                None => debug!(%topic, "Ignoring non-numeric value"),
            }
            Ok(())
        });
        self.subscriptions.push(subscription);
    }

    /// Status topic for a characteristic
    pub fn topic(&self, characteristic: &str) -> String {
        format!("{}:{}:{}", self.prefix, DEVICE_TYPE, characteristic)
    }

    pub fn state(&self) -> CoveringState {
        *self.state.lock()
    }

    /// Ask the gateway to move to `position`, clamped to 0-100
    pub fn set_target_position(&self, position: i64) {
        let position = clamp_position(position);
        let value = position.to_string();
        let fields = [
            self.prefix.as_str(),
            DEVICE_TYPE,
            SET_TARGET_POSITION,
            value.as_str(),
        ];
        match Command::new(fields) {
            Ok(command) => {
                self.state.lock().target_position = Some(position);
                self.commands.send_command(&command);
            }
            // Prefix is validated in new()
            Err(e) => debug!(error = %e, "Could not build command"),
        }
    }
}

impl AccessoryHandler for WindowCovering {
    fn device_type(&self) -> &str {
        DEVICE_TYPE
    }

    fn identity(&self) -> AccessoryIdentity {
        self.identity
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for WindowCovering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowCovering")
            .field("identity", &self.identity)
            .field("prefix", &self.prefix)
            .field("state", &self.state())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

fn clamp_position(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Builds [`WindowCovering`] handlers
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowCoveringFactory;

impl HandlerFactory for WindowCoveringFactory {
    fn device_type(&self) -> &str {
        DEVICE_TYPE
    }

    fn create(
        &self,
        context: &HandlerContext,
        accessory: &AccessoryHandle,
    ) -> Result<Box<dyn AccessoryHandler>, HandlerError> {
        Ok(Box::new(WindowCovering::new(context, accessory)?))
    }
}
