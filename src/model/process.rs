//! Behavioral process blocks.

use itertools::Itertools;

use super::wire::Wire;
use crate::deps::arcstr::ArcStr;

/// One entry of a process sensitivity list.
#[derive(Debug, Clone)]
pub enum Sensitivity {
    Level(Wire),
    Posedge(Wire),
    Negedge(Wire),
}

impl Sensitivity {
    pub fn wire(&self) -> &Wire {
        match self {
            Self::Level(w) | Self::Posedge(w) | Self::Negedge(w) => w,
        }
    }
}

/// A named concurrent process.
///
/// Statement lines are caller-authored VHDL text, rendered by the
/// constructor from final wire names during elaboration. The driven-wire
/// list is declared explicitly and feeds port-direction inference.
#[derive(Debug, Clone)]
pub struct Process {
    name: ArcStr,
    sensitivity: Vec<Sensitivity>,
    drives: Vec<Wire>,
    body: Vec<ArcStr>,
}

impl Process {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            sensitivity: Vec::new(),
            drives: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn sense(mut self, wire: &Wire) -> Self {
        self.sensitivity.push(Sensitivity::Level(wire.clone()));
        self
    }

    pub fn on_posedge(mut self, wire: &Wire) -> Self {
        self.sensitivity.push(Sensitivity::Posedge(wire.clone()));
        self
    }

    pub fn on_negedge(mut self, wire: &Wire) -> Self {
        self.sensitivity.push(Sensitivity::Negedge(wire.clone()));
        self
    }

    pub fn drive(mut self, wire: &Wire) -> Self {
        self.drives.push(wire.clone());
        self
    }

    pub fn stmt(mut self, line: impl Into<ArcStr>) -> Self {
        self.body.push(line.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn sensitivity(&self) -> &[Sensitivity] {
        &self.sensitivity
    }

    #[inline]
    pub fn drives(&self) -> &[Wire] {
        &self.drives
    }

    #[inline]
    pub fn body(&self) -> &[ArcStr] {
        &self.body
    }

    /// Whether this process drives `wire` (by identity).
    pub fn drives_wire(&self, wire: &Wire) -> bool {
        self.drives.iter().any(|w| w.same_wire(wire))
    }

    /// Renders the process as a VHDL process block into `out`.
    pub(crate) fn render(&self, out: &mut String) {
        let sens = self
            .sensitivity
            .iter()
            .map(|s| s.wire().name())
            .join(", ");
        if sens.is_empty() {
            out.push_str(&format!("    {} : process is\n", self.name));
        } else {
            out.push_str(&format!("    {} : process ({}) is\n", self.name, sens));
        }
        out.push_str("    begin\n");
        for line in self.body.iter() {
            out.push_str("        ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("    end process {};\n", self.name));
    }
}
