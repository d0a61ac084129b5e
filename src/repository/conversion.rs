use std::str::FromStr;

use poise::serenity_prelude::UserId;
use thiserror::Error;

use crate::models::{
    types::UtcDateTime, AssignedPairId, EventId, EventStatus, ExclusionRuleId, GroupId,
    ParticipantId, ReminderJobId, ReminderKind, RuleKind,
};

pub trait DBConvertible: Sized {
    type DBType;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError>;

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError>;
}

#[derive(Debug, Error)]
pub enum DBFromConversionError {
    #[error("Invalid timestamp: {0}")]
    DateTime(#[from] time::error::ComponentRange),
    #[error("Failed to parse enum variant: {0}")]
    NoSuchVariant(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(i64),
}

#[derive(Debug, Error)]
pub enum DBToConversionError {
    #[error("Number does not fit into the database: {0}")]
    InvalidNumber(u64),
}

impl DBConvertible for UtcDateTime {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        Ok(self.unix_timestamp())
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        Ok(UtcDateTime::from_unix_timestamp(*value)?)
    }
}

fn id_to_db(value: u64) -> Result<i64, DBToConversionError> {
    i64::try_from(value).map_err(|_| DBToConversionError::InvalidNumber(value))
}

fn id_from_db(value: i64) -> Result<u64, DBFromConversionError> {
    u64::try_from(value).map_err(|_| DBFromConversionError::InvalidNumber(value))
}

macro_rules! id_conversion {
    ($($id:ident),* $(,)?) => {
        $(
            impl DBConvertible for $id {
                type DBType = i64;

                fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
                    id_to_db(self.0)
                }

                fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
                    Ok($id(id_from_db(*value)?))
                }
            }
        )*
    };
}

id_conversion!(
    EventId,
    GroupId,
    ParticipantId,
    ExclusionRuleId,
    AssignedPairId,
    ReminderJobId
);

impl DBConvertible for UserId {
    type DBType = i64;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        id_to_db(self.get())
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        match id_from_db(*value)? {
            0 => Err(DBFromConversionError::InvalidNumber(0)),
            id => Ok(UserId::new(id)),
        }
    }
}

fn variant_to_db(value: impl Into<&'static str>) -> Result<String, DBToConversionError> {
    Ok(value.into().to_string())
}

fn variant_from_db<T: FromStr>(value: &str) -> Result<T, DBFromConversionError> {
    T::from_str(value).map_err(|_| DBFromConversionError::NoSuchVariant(value.to_string()))
}

impl DBConvertible for EventStatus {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        variant_to_db(*self)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        variant_from_db(value)
    }
}

impl DBConvertible for RuleKind {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        variant_to_db(*self)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        variant_from_db(value)
    }
}

impl DBConvertible for ReminderKind {
    type DBType = String;

    fn to_db(&self) -> Result<Self::DBType, DBToConversionError> {
        variant_to_db(*self)
    }

    fn from_db(value: &Self::DBType) -> Result<Self, DBFromConversionError> {
        variant_from_db(value)
    }
}
