/*
 * Created on Fri Oct 16 2026
 *
 * Copyright (c) fiche contributors. Licensed under the MIT Licence.
 */

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "fiche.toml";

/// Name reported in the service header
pub const SERVICE_NAME: &str = "fiche";

/// Header attached to every response
pub const SERVICE_HEADER: &str = "x-fiche";

/// Extension of stored paste files
pub const PASTE_EXTENSION: &str = "txt";
