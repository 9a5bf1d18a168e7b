//! Symbols a service card may show

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of service icons. Unknown names resolve to [`ServiceIcon::Eye`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceIcon {
    #[default]
    Eye,
    Glasses,
    Stethoscope,
    Heart,
    Activity,
    Scan,
    ShieldCheck,
    Baby,
    Users,
    Calendar,
    Clock,
    Microscope,
    Sparkles,
}

impl ServiceIcon {
    pub const ALL: [ServiceIcon; 13] = [
        ServiceIcon::Eye,
        ServiceIcon::Glasses,
        ServiceIcon::Stethoscope,
        ServiceIcon::Heart,
        ServiceIcon::Activity,
        ServiceIcon::Scan,
        ServiceIcon::ShieldCheck,
        ServiceIcon::Baby,
        ServiceIcon::Users,
        ServiceIcon::Calendar,
        ServiceIcon::Clock,
        ServiceIcon::Microscope,
        ServiceIcon::Sparkles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServiceIcon::Eye => "Eye",
            ServiceIcon::Glasses => "Glasses",
            ServiceIcon::Stethoscope => "Stethoscope",
            ServiceIcon::Heart => "Heart",
            ServiceIcon::Activity => "Activity",
            ServiceIcon::Scan => "Scan",
            ServiceIcon::ShieldCheck => "ShieldCheck",
            ServiceIcon::Baby => "Baby",
            ServiceIcon::Users => "Users",
            ServiceIcon::Calendar => "Calendar",
            ServiceIcon::Clock => "Clock",
            ServiceIcon::Microscope => "Microscope",
            ServiceIcon::Sparkles => "Sparkles",
        }
    }

    /// Resolves a stored `icon_name`. Matching ignores case and surrounding space.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|icon| icon.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }
}

impl fmt::Display for ServiceIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(ServiceIcon::from_name("Glasses"), ServiceIcon::Glasses);
        assert_eq!(ServiceIcon::from_name(" shieldcheck "), ServiceIcon::ShieldCheck);
    }

    #[test]
    fn unknown_names_default_to_eye() {
        assert_eq!(ServiceIcon::from_name("Rocket"), ServiceIcon::Eye);
        assert_eq!(ServiceIcon::from_name(""), ServiceIcon::Eye);
    }
}
