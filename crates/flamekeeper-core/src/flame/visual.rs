use serde::{Deserialize, Serialize};

/// Direction of a flame on/off flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlameTransition {
    Ignite,
    Extinguish,
}

impl FlameTransition {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            FlameTransition::Ignite
        } else {
            FlameTransition::Extinguish
        }
    }

    /// Target presentation once the transition has played.
    pub fn visual(self) -> VisualState {
        match self {
            FlameTransition::Ignite => VisualState {
                visible: true,
                opacity: 1.0,
                scale: 1.0,
                transition_ms: 0,
            },
            FlameTransition::Extinguish => VisualState {
                visible: false,
                opacity: 0.0,
                scale: 0.5,
                transition_ms: 300,
            },
        }
    }
}

/// Presentation hints for whatever renders the flame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub visible: bool,
    pub opacity: f32,
    pub scale: f32,
    /// Ease-in duration; zero means apply immediately.
    pub transition_ms: u32,
}

/// Receives flame output. Implemented by the rendering layer.
pub trait FlameSink: Send {
    /// Window mean for the current tick; 0 means the flame is out.
    fn intensity(&mut self, value: f64);

    /// Called whenever the enabled flag flips, and once on startup.
    fn transition(&mut self, _transition: FlameTransition) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extinguish_fades_out() {
        let v = FlameTransition::from_enabled(false).visual();
        assert!(!v.visible);
        assert_eq!(v.opacity, 0.0);
        assert_eq!(v.scale, 0.5);
        assert_eq!(v.transition_ms, 300);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&FlameTransition::Ignite).unwrap();
        assert_eq!(json, "\"ignite\"");
    }
}
