//! Turns raw change notifications into registration events.
//!
//! Each notification ends in exactly one of three actions, fully determined
//! by the record's kind label and the notification kind:
//!
//! | kind      | Added / Updated | Removed  |
//! |-----------|-----------------|----------|
//! | metadata  | register        | drop     |
//! | uri       | register        | offline  |
//! | api-doc   | drop            | drop     |
//! | other     | drop            | drop     |
use register_common::labels::REGISTER_TYPE_LABEL;
use register_common::{
    ChangeNotification, EventType, MetaDataRegisterDto, NotificationKind, RecordKind,
    RegisterEvent, RegistrationRecord, UriRegisterDto,
};
use serde::de::DeserializeOwned;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Register,
    Offline,
    Drop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    MissingLabels,
    MissingKindLabel,
    UnknownKind(String),
    /// Metadata is never withdrawn through the watch channel.
    MetadataRemoved,
    /// Reserved for future producers.
    ApiDoc,
    MissingData,
    Decode(String),
}

impl DropReason {
    /// Malformed or foreign objects, as opposed to drops required by policy.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, DropReason::MetadataRemoved | DropReason::ApiDoc)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingLabels => "missing_labels",
            DropReason::MissingKindLabel => "missing_kind_label",
            DropReason::UnknownKind(_) => "unknown_kind",
            DropReason::MetadataRemoved => "metadata_removed",
            DropReason::ApiDoc => "api_doc",
            DropReason::MissingData => "missing_data",
            DropReason::Decode(_) => "decode_error",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnknownKind(kind) => write!(f, "unknown record kind {kind:?}"),
            DropReason::Decode(error) => write!(f, "could not decode payload: {error}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Forward(RegisterEvent),
    Dropped(DropReason),
}

impl Outcome {
    pub fn action(&self) -> Action {
        match self {
            Outcome::Forward(event) if event.event_type() == EventType::Offline => Action::Offline,
            Outcome::Forward(_) => Action::Register,
            Outcome::Dropped(_) => Action::Drop,
        }
    }
}

/// Reads the kind label of a record.
pub fn record_kind(record: &RegistrationRecord) -> Result<RecordKind, DropReason> {
    let labels = match &record.labels {
        Some(labels) if !labels.is_empty() => labels,
        _ => return Err(DropReason::MissingLabels),
    };
    match labels.get(REGISTER_TYPE_LABEL) {
        Some(kind) if !kind.is_empty() => Ok(RecordKind::from_label(kind)),
        _ => Err(DropReason::MissingKindLabel),
    }
}

pub fn classify(notification: &ChangeNotification) -> Outcome {
    match try_classify(notification) {
        Ok(event) => Outcome::Forward(event),
        Err(reason) => Outcome::Dropped(reason),
    }
}

fn try_classify(notification: &ChangeNotification) -> Result<RegisterEvent, DropReason> {
    let record = &notification.record;
    match record_kind(record)? {
        RecordKind::Metadata => match notification.kind {
            NotificationKind::Added | NotificationKind::Updated => {
                decode::<MetaDataRegisterDto>(record).map(RegisterEvent::Metadata)
            }
            NotificationKind::Removed => Err(DropReason::MetadataRemoved),
        },
        RecordKind::Uri => {
            let mut uri = decode::<UriRegisterDto>(record)?;
            uri.event_type = match notification.kind {
                NotificationKind::Removed => EventType::Offline,
                NotificationKind::Added | NotificationKind::Updated => EventType::Register,
            };
            Ok(RegisterEvent::Uri(uri))
        }
        RecordKind::ApiDoc => Err(DropReason::ApiDoc),
        RecordKind::Unknown(kind) => Err(DropReason::UnknownKind(kind)),
    }
}

fn decode<T: DeserializeOwned>(record: &RegistrationRecord) -> Result<T, DropReason> {
    let payload = record.payload().ok_or(DropReason::MissingData)?;
    serde_json::from_str(payload).map_err(|e| DropReason::Decode(e.to_string()))
}
