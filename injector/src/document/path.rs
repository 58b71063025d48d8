// Copyright (c) 2025 Elektrobit Automotive GmbH
//
// This program and the accompanying materials are made available under the
// terms of the Apache License, Version 2.0 which is available at
// https://www.apache.org/licenses/LICENSE-2.0.
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.
//
// SPDX-License-Identifier: Apache-2.0

use crate::PATH_SEPARATOR;

/// Structural location inside a manifest, e.g. `spec.template.metadata`.
///
/// Numeric parts address sequence entries (`items.2.spec`). Annotation and label keys
/// contain dots, so they are joined as a single part from a `Vec<String>`.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq)]
pub struct Path {
    parts: Vec<String>,
}

impl Path {
    pub fn split_last(&self) -> Result<(Path, String), String> {
        let (last, head) = self
            .parts
            .split_last()
            .ok_or_else(|| String::from("The given path is empty"))?;
        Ok((
            Path {
                parts: head.to_owned(),
            },
            last.to_owned(),
        ))
    }

    pub fn parts(&self) -> &Vec<String> {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns a new path with the parts of `suffix` appended.
    pub fn join(&self, suffix: impl Into<Path>) -> Path {
        let mut parts = self.parts.clone();
        parts.extend(suffix.into().parts);
        Path { parts }
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        Path {
            parts: if value.is_empty() {
                vec![]
            } else {
                value.split(PATH_SEPARATOR).map(|x| x.into()).collect()
            },
        }
    }
}

impl From<String> for Path {
    fn from(value: String) -> Self {
        From::<&str>::from(&value)
    }
}

impl From<&String> for Path {
    fn from(value: &String) -> Self {
        From::<&str>::from(value)
    }
}

impl From<&Path> for String {
    fn from(value: &Path) -> Self {
        value.parts.join(&PATH_SEPARATOR.to_string())
    }
}

impl From<Vec<String>> for Path {
    fn from(value: Vec<String>) -> Self {
        Path { parts: value }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

//////////////////////////////////////////////////////////////////////////////
//                 ########  #######    #########  #########                //
//                    ##     ##        ##             ##                    //
//                    ##     #####     #########      ##                    //
//                    ##     ##                ##     ##                    //
//                    ##     #######   #########      ##                    //
//////////////////////////////////////////////////////////////////////////////
