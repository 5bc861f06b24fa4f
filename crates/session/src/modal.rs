use std::collections::BTreeSet;

use crate::effect::Effect;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModalId {
    Export,
    Help,
    Model3d,
}

impl ModalId {
    pub const ALL: [ModalId; 3] = [ModalId::Export, ModalId::Help, ModalId::Model3d];

    pub fn element_id(self) -> &'static str {
        match self {
            ModalId::Export => "modalExport",
            ModalId::Help => "modalHelp",
            ModalId::Model3d => "modal3D",
        }
    }

    pub fn close_button_id(self) -> &'static str {
        match self {
            ModalId::Export => "closeExport",
            ModalId::Help => "closeHelp",
            ModalId::Model3d => "close3D",
        }
    }

    /// Button that opens the dialog; the 3D viewer opens from feature buttons.
    pub fn open_button_id(self) -> Option<&'static str> {
        match self {
            ModalId::Export => Some("exportBtn"),
            ModalId::Help => Some("helpBtn"),
            ModalId::Model3d => None,
        }
    }

    pub fn parse(element_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.element_id() == element_id)
    }
}

pub fn model_title(name: &str) -> String {
    format!("🏔️ {name} - 3D Model")
}

/// Which dialogs are showing.
#[derive(Debug, Clone, Default)]
pub struct ModalController {
    open: BTreeSet<ModalId>,
}

impl ModalController {
    pub fn is_open(&self, id: ModalId) -> bool {
        self.open.contains(&id)
    }

    pub fn open(&mut self, id: ModalId) -> Vec<Effect> {
        self.open.insert(id);
        vec![Effect::ShowModal(id)]
    }

    pub fn open_model(&mut self, name: &str, path: &str) -> Vec<Effect> {
        self.open.insert(ModalId::Model3d);
        vec![
            Effect::SetModelViewer {
                title: Some(model_title(name)),
                src: path.to_string(),
            },
            Effect::ShowModal(ModalId::Model3d),
        ]
    }

    /// Hides `id`. The 3D viewer also drops its iframe source so the
    /// embedded scene stops running.
    pub fn close(&mut self, id: ModalId) -> Vec<Effect> {
        self.open.remove(&id);
        let mut effects = vec![Effect::HideModal(id)];
        if id == ModalId::Model3d {
            effects.push(Effect::SetModelViewer {
                title: None,
                src: String::new(),
            });
        }
        effects
    }

    /// Escape closes every dialog, open or not.
    pub fn close_all(&mut self) -> Vec<Effect> {
        ModalId::ALL
            .into_iter()
            .flat_map(|id| self.close(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn model_viewer_source_is_cleared_on_close() {
        let mut modals = ModalController::default();
        let effects = modals.open_model("Hailes Quarry Park", "models/hailes/index.html");
        assert_eq!(
            effects,
            vec![
                Effect::SetModelViewer {
                    title: Some("🏔️ Hailes Quarry Park - 3D Model".to_string()),
                    src: "models/hailes/index.html".to_string(),
                },
                Effect::ShowModal(ModalId::Model3d),
            ]
        );
        assert!(modals.is_open(ModalId::Model3d));

        let effects = modals.close(ModalId::Model3d);
        assert_eq!(
            effects,
            vec![
                Effect::HideModal(ModalId::Model3d),
                Effect::SetModelViewer {
                    title: None,
                    src: String::new()
                },
            ]
        );
        assert!(!modals.is_open(ModalId::Model3d));
    }

    #[test]
    fn escape_closes_everything() {
        let mut modals = ModalController::default();
        modals.open(ModalId::Help);
        let effects = modals.close_all();
        let hidden: Vec<ModalId> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::HideModal(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(hidden, ModalId::ALL.to_vec());
        assert!(!modals.is_open(ModalId::Help));
    }
}
