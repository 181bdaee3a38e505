//! Patch parsing, per-caller allowlists and field application.

use crate::config::InventoryConfig;
use crate::error::ControllerError;
use inventory_types::{
    Administrative, Availability, CallerClass, Decaying, Host, HostAction, InstallState,
    Operational, PatchDocument, PatchOp, PatchOpKind, Personality, RequestedAction,
    parse_subfunctions,
};
use std::net::IpAddr;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

/// Host fields reachable through a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum HostField {
    Action,
    Hostname,
    Personality,
    Subfunctions,
    MgmtIp,
    Location,
    Serialid,
    BmType,
    BmIp,
    BmUsername,
    BootDevice,
    RootfsDevice,
    Console,
    TtysDcd,
    Administrative,
    Operational,
    Availability,
    Task,
    Uptime,
    InstallState,
    VimProgressStatus,
}

use HostField as F;

const OPERATOR_FIELDS: &[HostField] = &[
    F::Action,
    F::Hostname,
    F::Personality,
    F::Subfunctions,
    F::MgmtIp,
    F::Location,
    F::Serialid,
    F::BmType,
    F::BmIp,
    F::BmUsername,
    F::BootDevice,
    F::RootfsDevice,
    F::Console,
    F::TtysDcd,
    F::Administrative,
];

const MTCE_FIELDS: &[HostField] = &[
    F::Administrative,
    F::Operational,
    F::Availability,
    F::Task,
    F::Uptime,
    F::InstallState,
];

const VIM_FIELDS: &[HostField] = &[F::Action, F::Task, F::VimProgressStatus];

/// Fields that skip the lifecycle pipeline when nothing else is patched.
pub const BYPASS_FIELDS: &[HostField] = &[F::Uptime, F::Location, F::Serialid, F::Task];

/// Fields `caller` may patch.
pub fn allowed_fields(caller: CallerClass) -> &'static [HostField] {
    match caller {
        CallerClass::Operator => OPERATOR_FIELDS,
        CallerClass::Mtce => MTCE_FIELDS,
        CallerClass::Vim => VIM_FIELDS,
    }
}

/// One validated field operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: HostField,
    pub op: PatchOp,
}

/// A validated patch document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPatch {
    pub action: Option<RequestedAction>,
    pub changes: Vec<FieldChange>,
}

impl ParsedPatch {
    /// Only bypass fields are touched.
    pub fn is_bypass(&self) -> bool {
        self.action.is_none()
            && !self.changes.is_empty()
            && self.changes.iter().all(|c| BYPASS_FIELDS.contains(&c.field))
    }

    /// Label used for metrics and logs.
    pub fn label(&self) -> String {
        match self.action {
            Some(action) => action.to_string(),
            None => "fields".to_string(),
        }
    }
}

/// Check every operation against the caller's allowlist and pull out the
/// requested action. An operator `administrative` change is read as the
/// matching lock or unlock action.
pub fn parse(doc: &PatchDocument, caller: CallerClass) -> Result<ParsedPatch, ControllerError> {
    if doc.is_empty() {
        return Err(ControllerError::Validation("patch document is empty".to_string()));
    }

    let allowed = allowed_fields(caller);
    let mut action = None;
    let mut changes = Vec::new();

    for op in doc {
        let name = op.field()?;
        let field = HostField::from_str(name)
            .map_err(|_| ControllerError::Validation(format!("Unknown host field '{name}'")))?;
        if !allowed.contains(&field) {
            return Err(ControllerError::Validation(format!(
                "Field '{name}' can not be modified by {caller}"
            )));
        }

        match field {
            F::Action => {
                let value = required_string(op)?;
                if value == HostAction::None.as_ref() {
                    continue;
                }
                action = Some(check_action_caller(RequestedAction::from_str(&value)?, caller)?);
            }
            F::Administrative if caller == CallerClass::Operator => {
                let wanted: Administrative = parse_value(op, "administrative")?;
                let implied = match wanted {
                    Administrative::Locked => HostAction::Lock,
                    Administrative::Unlocked => HostAction::Unlock,
                };
                action.get_or_insert(RequestedAction::Host(implied));
            }
            _ => changes.push(FieldChange {
                field,
                op: op.clone(),
            }),
        }
    }

    Ok(ParsedPatch { action, changes })
}

fn check_action_caller(action: RequestedAction, caller: CallerClass) -> Result<RequestedAction, ControllerError> {
    match (action, caller) {
        (RequestedAction::Vim(_), CallerClass::Vim) | (RequestedAction::Host(_), CallerClass::Operator) => {
            Ok(action)
        }
        _ => Err(ControllerError::Validation(format!(
            "Action '{action}' can not be requested by {caller}"
        ))),
    }
}

fn required_string(op: &PatchOp) -> Result<String, ControllerError> {
    op.string_value()?.ok_or_else(|| {
        ControllerError::Validation(format!("{} requires a value", op.path))
    })
}

fn parse_value<T: FromStr>(op: &PatchOp, field: &str) -> Result<T, ControllerError> {
    let value = required_string(op)?;
    value
        .parse()
        .map_err(|_| ControllerError::Validation(format!("Invalid value '{value}' for {field}")))
}

fn optional_string(op: &PatchOp) -> Result<Option<String>, ControllerError> {
    Ok(op
        .string_value()?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// What applying a set of changes bound for the first time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// Personality went from unset to set
    pub personality_bound: bool,
}

/// Apply field changes to `host`. Write-once fields reject any change of an
/// already bound value, whoever the caller is.
pub fn apply_changes(host: &mut Host, changes: &[FieldChange], config: &InventoryConfig) -> Result<Applied, ControllerError> {
    let mut applied = Applied::default();
    let mut subfunctions_given = false;

    for change in changes {
        let op = &change.op;
        match change.field {
            F::Hostname => {
                let value = optional_string(op)?;
                write_once(&mut host.hostname, value, "hostname", host.uuid)?;
            }
            F::Personality => {
                let value = match optional_string(op)? {
                    Some(v) => Some(Personality::from_str(&v).map_err(|_| {
                        ControllerError::Validation(format!("Invalid personality '{v}'"))
                    })?),
                    None => None,
                };
                let was_unset = host.personality.is_none();
                write_once(&mut host.personality, value, "personality", host.uuid)?;
                applied.personality_bound = was_unset && host.personality.is_some();
            }
            F::Subfunctions => {
                let value = optional_string(op)?.map(|v| parse_subfunctions(&v).join(","));
                write_once(&mut host.subfunctions, value, "subfunctions", host.uuid)?;
                subfunctions_given = true;
            }
            F::MgmtIp => {
                let value = optional_string(op)?;
                if let Some(ip) = value.as_deref() {
                    IpAddr::from_str(ip).map_err(|_| {
                        ControllerError::Validation(format!("Invalid management IP '{ip}'"))
                    })?;
                }
                host.mgmt_ip = value;
            }
            F::Location => {
                host.location = match op.op {
                    PatchOpKind::Remove => None,
                    _ => op.value.clone().filter(|v| !v.is_null()),
                };
            }
            F::Serialid => host.serialid = optional_string(op)?,
            F::BmType => host.bm_type = optional_string(op)?,
            F::BmIp => host.bm_ip = optional_string(op)?,
            F::BmUsername => host.bm_username = optional_string(op)?,
            F::BootDevice => host.boot_device = optional_string(op)?,
            F::RootfsDevice => host.rootfs_device = optional_string(op)?,
            F::Console => host.console = optional_string(op)?,
            F::TtysDcd => host.ttys_dcd = Some(parse_value(op, "ttys_dcd")?),
            F::Administrative => host.administrative = parse_value(op, "administrative")?,
            F::Operational => host.operational = parse_value::<Operational>(op, "operational")?,
            F::Availability => host.availability = parse_value::<Availability>(op, "availability")?,
            F::Task => host.task = optional_string(op)?,
            F::Uptime => host.uptime = parse_value(op, "uptime")?,
            F::InstallState => {
                let state: InstallState = parse_value(op, "install_state")?;
                if host.install_state.as_ref().map(|d| d.value) != Some(state) {
                    host.install_state = Some(Decaying::fresh(state));
                }
            }
            F::VimProgressStatus => {
                host.vim_progress = optional_string(op)?.map(Decaying::fresh);
            }
            F::Action => {}
        }
    }

    if applied.personality_bound
        && !subfunctions_given
        && host.subfunctions.is_none()
        && let Some(personality) = host.personality
    {
        host.subfunctions = Some(config.subfunctions_for(personality));
    }

    Ok(applied)
}

fn write_once<T: PartialEq + std::fmt::Display>(
    current: &mut Option<T>,
    value: Option<T>,
    field: &str,
    uuid: uuid::Uuid,
) -> Result<(), ControllerError> {
    match (current.as_ref(), value) {
        (None, value) => {
            *current = value;
            Ok(())
        }
        (Some(bound), Some(value)) if *bound == value => Ok(()),
        (Some(bound), _) => Err(ControllerError::Validation(format!(
            "Host {uuid} {field} is already set to {bound} and can not be changed"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_types::VimCallback;

    fn remove(path: &str) -> PatchOp {
        PatchOp {
            path: path.to_string(),
            op: PatchOpKind::Remove,
            value: None,
        }
    }

    #[test]
    fn test_operator_action_parsed() {
        let parsed = parse(&vec![PatchOp::replace("/action", "force-lock")], CallerClass::Operator).unwrap();
        assert_eq!(parsed.action, Some(RequestedAction::Host(HostAction::ForceLock)));
        assert!(parsed.changes.is_empty());
    }

    #[test]
    fn test_administrative_implies_action_for_operator() {
        let parsed = parse(&vec![PatchOp::replace("/administrative", "unlocked")], CallerClass::Operator).unwrap();
        assert_eq!(parsed.action, Some(RequestedAction::Host(HostAction::Unlock)));
    }

    #[test]
    fn test_mtce_sets_administrative_directly() {
        let parsed = parse(&vec![PatchOp::replace("/administrative", "locked")], CallerClass::Mtce).unwrap();
        assert_eq!(parsed.action, None);
        assert_eq!(parsed.changes[0].field, HostField::Administrative);
    }

    #[test]
    fn test_allowlist_per_caller() {
        let err = parse(&vec![PatchOp::replace("/availability", "available")], CallerClass::Operator);
        assert!(matches!(err, Err(ControllerError::Validation(m)) if m.contains("operator")));

        let err = parse(&vec![PatchOp::replace("/hostname", "x")], CallerClass::Vim);
        assert!(matches!(err, Err(ControllerError::Validation(_))));
    }

    #[test]
    fn test_vim_callbacks_only_from_vim() {
        let doc = vec![PatchOp::replace("/action", "services-disabled")];
        let parsed = parse(&doc, CallerClass::Vim).unwrap();
        assert_eq!(parsed.action, Some(RequestedAction::Vim(VimCallback::ServicesDisabled)));
        assert!(parse(&doc, CallerClass::Operator).is_err());

        let lock = vec![PatchOp::replace("/action", "lock")];
        assert!(parse(&lock, CallerClass::Vim).is_err());
    }

    #[test]
    fn test_bypass_subset() {
        let parsed = parse(
            &vec![PatchOp::replace("/uptime", 1200), PatchOp::replace("/task", "Booting")],
            CallerClass::Mtce,
        )
        .unwrap();
        assert!(parsed.is_bypass());

        let parsed = parse(
            &vec![PatchOp::replace("/location", serde_json::json!({"name": "rack1"})), PatchOp::replace("/hostname", "w0")],
            CallerClass::Operator,
        )
        .unwrap();
        assert!(!parsed.is_bypass());
    }

    #[test]
    fn test_personality_is_write_once_and_derives_subfunctions() {
        let config = InventoryConfig::default();
        let mut host = Host::new("08:00:27:aa:bb:cc");
        let changes = vec![FieldChange {
            field: HostField::Personality,
            op: PatchOp::replace("/personality", "worker"),
        }];
        let applied = apply_changes(&mut host, &changes, &config).unwrap();
        assert!(applied.personality_bound);
        assert_eq!(host.subfunctions.as_deref(), Some("worker"));

        // same value again is accepted
        let applied = apply_changes(&mut host, &changes, &config).unwrap();
        assert!(!applied.personality_bound);

        let change = vec![FieldChange {
            field: HostField::Personality,
            op: PatchOp::replace("/personality", "storage"),
        }];
        assert!(matches!(
            apply_changes(&mut host, &change, &config),
            Err(ControllerError::Validation(_))
        ));

        let clear = vec![FieldChange {
            field: HostField::Subfunctions,
            op: remove("/subfunctions"),
        }];
        assert!(matches!(
            apply_changes(&mut host, &clear, &config),
            Err(ControllerError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_mgmt_ip_rejected() {
        let mut host = Host::new("08:00:27:aa:bb:cc");
        let changes = vec![FieldChange {
            field: HostField::MgmtIp,
            op: PatchOp::replace("/mgmt_ip", "192.168.204.300"),
        }];
        assert!(matches!(
            apply_changes(&mut host, &changes, &InventoryConfig::default()),
            Err(ControllerError::Validation(_))
        ));
    }
}
