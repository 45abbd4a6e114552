use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
        }
    }
}

/// Description of one machine involved in the build. There are always three
/// of these (build, host, target); for a native build they are identical.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineInfo {
    pub system: String,
    pub cpu_family: String,
    pub cpu: String,
    pub endian: Endian,
}

impl MachineInfo {
    pub fn new(
        system: impl Into<String>,
        cpu_family: impl Into<String>,
        cpu: impl Into<String>,
        endian: Endian,
    ) -> Self {
        Self {
            system: system.into(),
            cpu_family: cpu_family.into(),
            cpu: cpu.into(),
            endian,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineChoice {
    Build,
    #[default]
    Host,
    Target,
}

impl MachineChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineChoice::Build => "build",
            MachineChoice::Host => "host",
            MachineChoice::Target => "target",
        }
    }

    /// The machine a `native:` kwarg selects: `native: true` compiles for
    /// the machine the build runs on, everything else targets the host.
    pub fn from_native_flag(native: bool) -> Self {
        if native {
            MachineChoice::Build
        } else {
            MachineChoice::Host
        }
    }
}

/// One slot per machine role. Lookups go through [`PerMachine::get`] so the
/// native-build collapse (host == build) stays in one place.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerMachine<T> {
    pub build: T,
    pub host: T,
    pub target: T,
}

impl<T> PerMachine<T> {
    pub fn new(build: T, host: T, target: T) -> Self {
        Self {
            build,
            host,
            target,
        }
    }

    pub fn get(&self, choice: MachineChoice) -> &T {
        match choice {
            MachineChoice::Build => &self.build,
            MachineChoice::Host => &self.host,
            MachineChoice::Target => &self.target,
        }
    }

    pub fn get_mut(&mut self, choice: MachineChoice) -> &mut T {
        match choice {
            MachineChoice::Build => &mut self.build,
            MachineChoice::Host => &mut self.host,
            MachineChoice::Target => &mut self.target,
        }
    }
}

impl<T: Clone> PerMachine<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            build: value.clone(),
            host: value.clone(),
            target: value,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Machines {
    pub info: PerMachine<MachineInfo>,
}

impl Machines {
    pub fn native(info: MachineInfo) -> Self {
        Self {
            info: PerMachine::uniform(info),
        }
    }

    pub fn cross(build: MachineInfo, host: MachineInfo) -> Self {
        Self {
            info: PerMachine::new(build, host.clone(), host),
        }
    }

    pub fn is_cross_build(&self) -> bool {
        self.info.build != self.info.host
    }
}
