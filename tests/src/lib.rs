#![cfg(test)]

mod fixtures;

mod configure;
mod dependencies;
mod disabler;
mod minimal;
mod modules_ext;
mod options_scope;
mod sandboxing;
mod scripts;
mod strings;
mod subdirs;
mod subprojects;
mod targets;
