//! Typed responses and their positional wire form.
//!
//! Every response becomes a [`Value::Array`] whose first element is the
//! [`Status`] atom. The remaining elements are the payload in a fixed order
//! per operation.

use core::fmt;

use hive_sqf::Value;

/// Protocol version reported at the end of a login response.
pub const PROTOCOL_VERSION: f64 = 0.96;

/// First element of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success; the payload follows.
    Pass,
    /// Failure; no payload.
    Error,
    /// One record of a bulk object load.
    Obj,
}

impl Status {
    /// The wire atom.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Error => "ERROR",
            Self::Obj => "OBJ",
        }
    }

    /// A response consisting of this status alone.
    pub fn alone(self) -> Value {
        Value::Array(vec![self.into()])
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Status> for Value {
    fn from(status: Status) -> Self {
        Self::string(status.as_str())
    }
}

/// `[minutes alive, minutes since ate, minutes since drank]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurvivalTimers {
    /// Minutes since the character was created.
    pub minutes_alive: i32,
    /// Minutes since the character last ate.
    pub minutes_since_ate: i32,
    /// Minutes since the character last drank.
    pub minutes_since_drank: i32,
}

impl From<SurvivalTimers> for Value {
    fn from(t: SurvivalTimers) -> Self {
        Self::Array(vec![
            t.minutes_alive.into(),
            t.minutes_since_ate.into(),
            t.minutes_since_drank.into(),
        ])
    }
}

/// Result of a player login.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResponse {
    /// Creating or finding the character failed.
    Error,
    /// The player already had a living character in the instance.
    Existing {
        /// Whether the profile was created by this login.
        new_player: bool,
        /// Character id.
        character_id: i32,
        /// Stored worldspace.
        worldspace: Value,
        /// Stored inventory.
        inventory: Value,
        /// Stored backpack.
        backpack: Value,
        /// Survival timers.
        survival: SurvivalTimers,
        /// Character model class; empty lets the game pick a default.
        model: String,
    },
    /// A new character was created by this login.
    Created {
        /// Whether the profile was created by this login.
        new_player: bool,
        /// Id of the new character.
        character_id: i32,
        /// Character model class; empty lets the game pick a default.
        model: String,
    },
}

impl LoginResponse {
    /// The character id, unless the login failed.
    pub const fn character_id(&self) -> Option<i32> {
        match self {
            Self::Error => None,
            Self::Existing { character_id, .. } | Self::Created { character_id, .. } => {
                Some(*character_id)
            }
        }
    }

    /// Whether this login created the character.
    pub const fn is_new_character(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    /// Wire form. The character id travels as a string.
    ///
    /// `["PASS", newPlayer, "<id>", worldspace, inventory, backpack, survival, model, 0.96]`
    /// for an existing character, `["PASS", newPlayer, "<id>", model, 0.96]`
    /// for a new one.
    pub fn into_value(self) -> Value {
        match self {
            Self::Error => Status::Error.alone(),
            Self::Existing {
                new_player,
                character_id,
                worldspace,
                inventory,
                backpack,
                survival,
                model,
            } => Value::Array(vec![
                Status::Pass.into(),
                new_player.into(),
                Value::String(character_id.to_string()),
                worldspace,
                inventory,
                backpack,
                survival.into(),
                model.into(),
                PROTOCOL_VERSION.into(),
            ]),
            Self::Created {
                new_player,
                character_id,
                model,
            } => Value::Array(vec![
                Status::Pass.into(),
                new_player.into(),
                Value::String(character_id.to_string()),
                model.into(),
                PROTOCOL_VERSION.into(),
            ]),
        }
    }
}

impl From<LoginResponse> for Value {
    fn from(response: LoginResponse) -> Self {
        response.into_value()
    }
}

/// Per-character kill counters, in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillStats {
    /// Zombies killed.
    pub zombie_kills: i32,
    /// Headshots landed.
    pub headshots: i32,
    /// Survivors killed.
    pub survivor_kills: i32,
    /// Bandits killed.
    pub bandit_kills: i32,
}

impl From<KillStats> for Value {
    fn from(k: KillStats) -> Self {
        Self::Array(vec![
            k.zombie_kills.into(),
            k.headshots.into(),
            k.survivor_kills.into(),
            k.bandit_kills.into(),
        ])
    }
}

/// Character state loaded after login.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDetails {
    /// Medical state; `[]` lets the game fill it in.
    pub medical: Value,
    /// Kill counters.
    pub stats: KillStats,
    /// Free-form state blob.
    pub state: Value,
    /// Stored worldspace.
    pub worldspace: Value,
    /// Humanity of the owning profile.
    pub humanity: i32,
}

/// Result of a character details fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailsResponse {
    /// No such character.
    Error,
    /// The character's details.
    Pass(CharacterDetails),
}

impl DetailsResponse {
    /// Wire form:
    /// `["PASS", medical, [zombie, headshots, survivor, bandit], state, worldspace, humanity]`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Error => Status::Error.alone(),
            Self::Pass(d) => Value::Array(vec![
                Status::Pass.into(),
                d.medical,
                d.stats.into(),
                d.state,
                d.worldspace,
                d.humanity.into(),
            ]),
        }
    }
}

impl From<DetailsResponse> for Value {
    fn from(response: DetailsResponse) -> Self {
        response.into_value()
    }
}
