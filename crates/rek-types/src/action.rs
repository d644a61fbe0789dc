use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// What produced an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Receipt,
    Issue,
    Adjust,
    Inventory,
    Create,
    Update,
    Delete,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        Self::Receipt,
        Self::Issue,
        Self::Adjust,
        Self::Inventory,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// Returns `true` for actions that can change an on-hand quantity.
    pub fn moves_stock(self) -> bool {
        matches!(
            self,
            Self::Receipt | Self::Issue | Self::Adjust | Self::Inventory
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Issue => "issue",
            Self::Adjust => "adjust",
            Self::Inventory => "inventory",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownAction(s.to_string()))
    }
}

/// The three kinds of business document the ledger knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Receipt,
    Issue,
    Inventory,
}

impl DocumentKind {
    /// Audit action written for stock moved by a document of this kind.
    pub fn action(self) -> ActionType {
        match self {
            Self::Receipt => ActionType::Receipt,
            Self::Issue => ActionType::Issue,
            Self::Inventory => ActionType::Inventory,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Issue => "issue",
            Self::Inventory => "inventory",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receipt" => Ok(Self::Receipt),
            "issue" => Ok(Self::Issue),
            "inventory" => Ok(Self::Inventory),
            _ => Err(TypeError::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quantity_actions_move_stock() {
        let moving: Vec<_> = ActionType::ALL
            .into_iter()
            .filter(|a| a.moves_stock())
            .collect();
        assert_eq!(
            moving,
            vec![
                ActionType::Receipt,
                ActionType::Issue,
                ActionType::Adjust,
                ActionType::Inventory
            ]
        );
    }

    #[test]
    fn action_parse_roundtrips_display() {
        for action in ActionType::ALL {
            assert_eq!(action.to_string().parse::<ActionType>().unwrap(), action);
        }
        assert!("transfer".parse::<ActionType>().is_err());
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ActionType::Inventory).unwrap(),
            "\"inventory\""
        );
    }

    #[test]
    fn document_kind_maps_to_action() {
        assert_eq!(DocumentKind::Receipt.action(), ActionType::Receipt);
        assert_eq!(DocumentKind::Issue.action(), ActionType::Issue);
        assert_eq!(DocumentKind::Inventory.action(), ActionType::Inventory);
        assert_eq!("Issue".parse::<DocumentKind>().unwrap(), DocumentKind::Issue);
    }
}
