use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::deps::{Dependency, DependencyId};
use crate::machines::{MachineChoice, PerMachine};
use crate::manifest::DepManifestEntry;
use crate::ports::CompilerHandle;
use crate::targets::{
    AnyTarget, ExternalProgram, InstallData, InstallDir, InstallHeaders, InstallMan, RunScript,
    TestCase, TestSetup,
};

#[derive(Debug, Clone)]
pub struct BuildError(pub String);

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BuildError {}

#[derive(Clone, Debug, PartialEq)]
pub struct DependencyOverride {
    pub dep: Rc<Dependency>,
    /// True for `meson.override_dependency`, false for the automatic
    /// registration of a freshly found dependency.
    pub explicit: bool,
    pub origin: String,
}

/// The single process-wide record of everything the build definitions
/// declared. One instance is created for the top-level evaluation and shared
/// by reference with every subproject evaluator.
#[derive(Default)]
pub struct Build {
    pub project_name: String,
    pub project_version: String,

    targets: IndexMap<String, AnyTarget>,
    global_args_frozen: bool,
    project_args_frozen: HashSet<String>,

    pub install_scripts: Vec<RunScript>,
    pub postconf_scripts: Vec<RunScript>,
    pub dist_scripts: Vec<RunScript>,
    pub install_dirs: Vec<InstallDir>,
    pub data: Vec<InstallData>,
    pub headers: Vec<InstallHeaders>,
    pub man: Vec<InstallMan>,
    pub tests: Vec<TestCase>,
    pub benchmarks: Vec<TestCase>,
    pub run_target_names: HashSet<(String, String)>,

    pub compilers: PerMachine<IndexMap<String, CompilerHandle>>,

    dependency_overrides: PerMachine<IndexMap<DependencyId, DependencyOverride>>,
    dependency_cache: PerMachine<IndexMap<DependencyId, Rc<Dependency>>>,

    pub global_args: PerMachine<IndexMap<String, Vec<String>>>,
    pub global_link_args: PerMachine<IndexMap<String, Vec<String>>>,
    pub project_args: PerMachine<IndexMap<(String, String), Vec<String>>>,
    pub project_link_args: PerMachine<IndexMap<(String, String), Vec<String>>>,
    pub stdlibs: PerMachine<IndexMap<(String, String), Rc<Dependency>>>,

    pub dep_manifest: IndexMap<String, DepManifestEntry>,

    find_overrides: IndexMap<String, Rc<ExternalProgram>>,
    searched_programs: HashSet<String>,

    test_setups: IndexMap<String, TestSetup>,
    test_setup_default_name: Option<String>,

    build_def_files: Vec<PathBuf>,
}

impl Build {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: AnyTarget) -> Result<String, BuildError> {
        let id = target.id();
        if self.targets.contains_key(&id) {
            return Err(BuildError(format!(
                "target \"{}\" has the same id \"{id}\" as an already declared target",
                target.name()
            )));
        }
        if let AnyTarget::Run(rt) = &target {
            self.run_target_names
                .insert((rt.subproject.clone(), rt.name.clone()));
        }
        self.global_args_frozen = true;
        self.project_args_frozen
            .insert(target.subproject().to_owned());
        self.targets.insert(id.clone(), target);
        Ok(id)
    }

    pub fn targets(&self) -> &IndexMap<String, AnyTarget> {
        &self.targets
    }

    pub fn get_target(&self, id: &str) -> Option<&AnyTarget> {
        self.targets.get(id)
    }

    pub fn get_target_mut(&mut self, id: &str) -> Option<&mut AnyTarget> {
        self.targets.get_mut(id)
    }

    pub fn add_global_args(
        &mut self,
        machine: MachineChoice,
        language: &str,
        args: &[String],
        link: bool,
    ) -> Result<(), BuildError> {
        if self.global_args_frozen {
            return Err(BuildError(
                "global arguments can not be set once a build target has been declared".to_owned(),
            ));
        }
        let table = if link {
            &mut self.global_link_args
        } else {
            &mut self.global_args
        };
        table
            .get_mut(machine)
            .entry(language.to_owned())
            .or_default()
            .extend(args.iter().cloned());
        Ok(())
    }

    pub fn add_project_args(
        &mut self,
        machine: MachineChoice,
        subproject: &str,
        language: &str,
        args: &[String],
        link: bool,
    ) -> Result<(), BuildError> {
        if self.project_args_frozen.contains(subproject) {
            return Err(BuildError(
                "project arguments can not be set once a build target of the project has been declared"
                    .to_owned(),
            ));
        }
        let table = if link {
            &mut self.project_link_args
        } else {
            &mut self.project_args
        };
        table
            .get_mut(machine)
            .entry((subproject.to_owned(), language.to_owned()))
            .or_default()
            .extend(args.iter().cloned());
        Ok(())
    }

    /// Entering a subproject freezes the parent's ability to add global
    /// arguments, whatever targets the child goes on to declare.
    pub fn freeze_global_args(&mut self) {
        self.global_args_frozen = true;
    }

    pub fn cached_dependency(&self, id: &DependencyId) -> Option<Rc<Dependency>> {
        self.dependency_cache.get(id.machine).get(id).cloned()
    }

    pub fn store_dependency(&mut self, id: DependencyId, dep: Rc<Dependency>) {
        let machine = id.machine;
        self.dependency_cache.get_mut(machine).insert(id, dep);
    }

    pub fn dependency_override(&self, id: &DependencyId) -> Option<&DependencyOverride> {
        self.dependency_overrides.get(id.machine).get(id)
    }

    pub fn add_dependency_override(
        &mut self,
        id: DependencyId,
        entry: DependencyOverride,
    ) -> Result<(), BuildError> {
        let machine = id.machine;
        let table = self.dependency_overrides.get_mut(machine);
        if let Some(existing) = table.get(&id) {
            if existing.explicit && entry.explicit {
                return Err(BuildError(format!(
                    "tried to override dependency \"{}\" which has already been overridden at {}",
                    id.name, existing.origin
                )));
            }
            // Automatic registration never displaces anything.
            if !entry.explicit {
                return Ok(());
            }
        }
        table.insert(id, entry);
        Ok(())
    }

    pub fn find_override(&self, name: &str) -> Option<Rc<ExternalProgram>> {
        self.find_overrides.get(name).cloned()
    }

    pub fn add_find_override(
        &mut self,
        name: &str,
        program: Rc<ExternalProgram>,
    ) -> Result<(), BuildError> {
        if self.find_overrides.contains_key(name) {
            return Err(BuildError(format!(
                "tried to override program \"{name}\" twice"
            )));
        }
        if self.searched_programs.contains(name) {
            return Err(BuildError(format!(
                "tried to override program \"{name}\" which has already been found"
            )));
        }
        self.find_overrides.insert(name.to_owned(), program);
        Ok(())
    }

    pub fn note_program_searched(&mut self, name: &str) {
        self.searched_programs.insert(name.to_owned());
    }

    pub fn add_test_setup(&mut self, setup: TestSetup, is_default: bool) -> Result<(), BuildError> {
        if self.test_setups.contains_key(&setup.name) {
            return Err(BuildError(format!(
                "duplicate test setup \"{}\"",
                setup.name
            )));
        }
        if is_default {
            if let Some(existing) = &self.test_setup_default_name {
                return Err(BuildError(format!(
                    "\"{}\" is already set as default; \
                     is_default can be set to true only once",
                    existing
                )));
            }
            self.test_setup_default_name = Some(setup.name.clone());
        }
        self.test_setups.insert(setup.name.clone(), setup);
        Ok(())
    }

    pub fn test_setups(&self) -> &IndexMap<String, TestSetup> {
        &self.test_setups
    }

    pub fn test_setup_default(&self) -> Option<&str> {
        self.test_setup_default_name.as_deref()
    }

    pub fn add_build_def_file(&mut self, path: PathBuf) {
        if !self.build_def_files.contains(&path) {
            self.build_def_files.push(path);
        }
    }

    pub fn build_def_files(&self) -> &[PathBuf] {
        &self.build_def_files
    }
}
