// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use thiserror::Error;

use crate::app::console::{Console, ConsoleOpts};
use crate::app::{AppConfig, ExitStatus};

pub mod services;
pub mod traffic;
pub mod users;

/** Return type for App modules that go through multiple steps
 *
 * An App module goes through multiple distinct steps to eventually fulfill its task. A step may
 * finish without errors but still not obtain the information the next step needs. In that case it
 * returns `PartialError::Failed` with the exit status the process should terminate with.
 *
 * Think of it as a means for early returns.
 */
pub type PartialResult<T> = std::result::Result<T, PartialError>;

#[derive(Debug, Error)]
pub enum PartialError {
    #[error("module step failed")]
    Failed(ExitStatus),
    #[error(transparent)]
    Err(#[from] anyhow::Error),
}

pub trait PartialResultExt {
    fn into_result(self) -> anyhow::Result<ExitStatus>;
}

impl PartialResultExt for PartialResult<ExitStatus> {
    fn into_result(self) -> anyhow::Result<ExitStatus> {
        match self {
            Ok(exit_status) => Ok(exit_status),
            Err(PartialError::Failed(exit_status)) => Ok(exit_status),
            Err(PartialError::Err(err)) => Err(err),
        }
    }
}

/** Pass environment like configs and console access from step to step
 */
pub struct Environment<'a, T> {
    pub app_config: &'a AppConfig,
    pub mod_config: &'a T,
    pub console: Console,
}

impl<'a, T> Environment<'a, T> {
    pub fn new(app_config: &'a AppConfig, mod_config: &'a T, console: Console) -> Environment<'a, T> {
        Environment {
            app_config,
            mod_config,
            console,
        }
    }
}

pub trait AppModule<T> {
    fn init_env<'a>(app_config: &'a AppConfig, mod_config: &'a T) -> PartialResult<Environment<'a, T>> {
        let console_opts = ConsoleOpts::from(app_config);
        let console = Console::new(console_opts);

        Ok(Environment::new(app_config, mod_config, console))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn failed_step_becomes_exit_status() {
        let res: PartialResult<ExitStatus> = Err(PartialError::Failed(ExitStatus::Failed));

        let res = res.into_result();

        assert_that(&res.is_ok()).is_true();
        assert_that(&res.unwrap()).is_equal_to(ExitStatus::Failed);
    }

    #[test]
    fn error_stays_error() {
        let res: PartialResult<ExitStatus> = Err(anyhow!("boom").into());

        assert_that(&res.into_result().is_err()).is_true();
    }
}
