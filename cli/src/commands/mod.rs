pub(crate) mod path_helpers;
pub(crate) mod show;
pub(crate) mod strings;

pub(crate) use show::command_show;
pub(crate) use strings::command_strings;
