use std::collections::BTreeMap;
use std::fmt;

/// The six data layers the map can show.
///
/// Variant order is the default stacking order, bottom to top.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKey {
    StudyArea,
    Postcode,
    Simd,
    FloodZones,
    Greenspaces,
    FloodDamage,
}

impl LayerKey {
    pub const ALL: [LayerKey; 6] = [
        LayerKey::StudyArea,
        LayerKey::Postcode,
        LayerKey::Simd,
        LayerKey::FloodZones,
        LayerKey::Greenspaces,
        LayerKey::FloodDamage,
    ];

    /// Name used in `data-layer` attributes.
    pub const fn as_str(self) -> &'static str {
        match self {
            LayerKey::StudyArea => "studyArea",
            LayerKey::Postcode => "postcode",
            LayerKey::Simd => "simd",
            LayerKey::FloodZones => "floodZones",
            LayerKey::Greenspaces => "greenspaces",
            LayerKey::FloodDamage => "floodDamage",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Id of the visibility checkbox for this layer.
    pub const fn checkbox_id(self) -> &'static str {
        match self {
            LayerKey::StudyArea => "layerStudyArea",
            LayerKey::Postcode => "layerPostcode",
            LayerKey::Simd => "layerSimd",
            LayerKey::FloodZones => "layerFloodZones",
            LayerKey::Greenspaces => "layerGreenspaces",
            LayerKey::FloodDamage => "layerFloodDamage",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerOrderError {
    #[error("layer order must list {expected} layers, got {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("layer {0} listed more than once")]
    Duplicate(LayerKey),
    #[error("unknown layer name: {0}")]
    UnknownName(String),
}

/// Stacking order of the layers; later entries render on top.
///
/// Always a permutation of [`LayerKey::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOrder {
    keys: Vec<LayerKey>,
}

impl Default for LayerOrder {
    fn default() -> Self {
        Self {
            keys: LayerKey::ALL.to_vec(),
        }
    }
}

impl LayerOrder {
    pub fn from_keys(keys: Vec<LayerKey>) -> Result<Self, LayerOrderError> {
        if keys.len() != LayerKey::ALL.len() {
            return Err(LayerOrderError::WrongLength {
                expected: LayerKey::ALL.len(),
                found: keys.len(),
            });
        }
        let mut seen = [false; 6];
        for key in &keys {
            if std::mem::replace(&mut seen[key.index()], true) {
                return Err(LayerOrderError::Duplicate(*key));
            }
        }
        Ok(Self { keys })
    }

    /// Builds an order from `data-layer` names as read back from the panel.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, LayerOrderError> {
        let keys = names
            .iter()
            .map(|n| {
                let n = n.as_ref();
                LayerKey::parse(n).ok_or_else(|| LayerOrderError::UnknownName(n.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_keys(keys)
    }

    pub fn keys(&self) -> &[LayerKey] {
        &self.keys
    }

    /// Layers to bring to front, in sequence, so the final stacking matches
    /// this order. Only layers accepted by `include` take part.
    pub fn restack_plan(&self, include: impl Fn(LayerKey) -> bool) -> Vec<LayerKey> {
        self.keys.iter().copied().filter(|k| include(*k)).collect()
    }
}

/// Checkbox state per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerVisibility {
    checked: [bool; 6],
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self { checked: [true; 6] }
    }
}

impl LayerVisibility {
    pub fn is_checked(&self, key: LayerKey) -> bool {
        self.checked[key.index()]
    }

    pub fn set(&mut self, key: LayerKey, checked: bool) {
        self.checked[key.index()] = checked;
    }
}

/// At most one live value per layer key.
///
/// Replacing a slot hands back the previous occupant so the caller can
/// detach it before the new one is attached.
#[derive(Debug, Clone)]
pub struct LayerSlots<H> {
    slots: BTreeMap<LayerKey, H>,
}

impl<H> Default for LayerSlots<H> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<H> LayerSlots<H> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "the previous occupant must be detached"]
    pub fn replace(&mut self, key: LayerKey, handle: H) -> Option<H> {
        self.slots.insert(key, handle)
    }

    /// Replaces the slot with `handle`, or empties it when the rebuild
    /// produced nothing, so no stale handle outlives its data.
    #[must_use = "the previous occupant must be detached"]
    pub fn install(&mut self, key: LayerKey, handle: Option<H>) -> Option<H> {
        match handle {
            Some(handle) => self.slots.insert(key, handle),
            None => self.slots.remove(&key),
        }
    }

    pub fn get(&self, key: LayerKey) -> Option<&H> {
        self.slots.get(&key)
    }

    pub fn get_mut(&mut self, key: LayerKey) -> Option<&mut H> {
        self.slots.get_mut(&key)
    }

    pub fn take(&mut self, key: LayerKey) -> Option<H> {
        self.slots.remove(&key)
    }

    pub fn contains(&self, key: LayerKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_round_trip_through_parse() {
        for key in LayerKey::ALL {
            assert_eq!(LayerKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(LayerKey::parse("buildings"), None);
        assert_eq!(LayerKey::FloodDamage.checkbox_id(), "layerFloodDamage");
    }

    #[test]
    fn order_rejects_non_permutations() {
        assert_eq!(
            LayerOrder::from_keys(vec![LayerKey::Simd]),
            Err(LayerOrderError::WrongLength {
                expected: 6,
                found: 1
            })
        );
        let mut dup = LayerKey::ALL.to_vec();
        dup[0] = LayerKey::Simd;
        assert_eq!(
            LayerOrder::from_keys(dup),
            Err(LayerOrderError::Duplicate(LayerKey::Simd))
        );
        assert_eq!(
            LayerOrder::from_names(&["studyArea", "roads"]),
            Err(LayerOrderError::UnknownName("roads".to_string()))
        );
    }

    #[test]
    fn restack_plan_puts_last_visible_layer_on_top() {
        let order = LayerOrder::from_names(&[
            "floodDamage",
            "studyArea",
            "postcode",
            "simd",
            "floodZones",
            "greenspaces",
        ])
        .expect("permutation");

        let plan = order.restack_plan(|k| k != LayerKey::Simd);
        assert_eq!(
            plan,
            vec![
                LayerKey::FloodDamage,
                LayerKey::StudyArea,
                LayerKey::Postcode,
                LayerKey::FloodZones,
                LayerKey::Greenspaces,
            ]
        );
        assert_eq!(plan.last(), Some(&LayerKey::Greenspaces));
    }

    #[test]
    fn slots_hand_back_previous_handle() {
        let mut slots = LayerSlots::new();
        assert_eq!(slots.replace(LayerKey::Postcode, 1), None);
        assert_eq!(slots.replace(LayerKey::Postcode, 2), Some(1));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.get(LayerKey::Postcode), Some(&2));
        assert_eq!(slots.take(LayerKey::Postcode), Some(2));
        assert!(slots.is_empty());
    }

    #[test]
    fn failed_rebuild_empties_the_slot() {
        let mut slots = LayerSlots::new();
        assert_eq!(slots.install(LayerKey::FloodDamage, Some("old")), None);
        assert_eq!(slots.install(LayerKey::FloodDamage, None), Some("old"));
        assert!(!slots.contains(LayerKey::FloodDamage));
        assert_eq!(slots.install(LayerKey::FloodDamage, Some("new")), None);
        assert_eq!(slots.get(LayerKey::FloodDamage), Some(&"new"));
    }
}
