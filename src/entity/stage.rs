use serde::{
    Deserialize,
    Serialize,
};

use super::action::*;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StageActions {
    #[serde(rename = "stage-partition")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub partition: Vec<ActionPartition>,

    #[serde(rename = "stage-provision")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub provision: Vec<ActionProvision>,

    #[serde(rename = "stage-bootstrap")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bootstrap: Vec<ActionBootstrap>,

    #[serde(rename = "stage-configure")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub configure: Vec<ActionConfigure>,

    #[serde(rename = "stage-boot")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub boot: Vec<ActionBoot>,

    #[serde(rename = "stage-harden")]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub harden: Vec<ActionHarden>,
}

impl StageActions {
    /// Hardening steps that were downgraded to warnings
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.harden.iter().filter_map(|action| match action {
            ActionHarden::Warning { step, error } => Some((step.as_str(), error.as_str())),
            _ => None,
        })
    }
}

#[test]
fn test_warnings() {
    let stages = StageActions {
        bootstrap: vec![ActionBootstrap::GenFstab],
        harden: vec![
            ActionHarden::BruteforceGuard,
            ActionHarden::Warning {
                step: "firewall".into(),
                error: "no ufw".into(),
            },
        ],
        ..Default::default()
    };

    assert_eq!(vec![("firewall", "no ufw")], stages.warnings().collect::<Vec<_>>());
    assert_eq!(0, StageActions::default().warnings().count());
}
