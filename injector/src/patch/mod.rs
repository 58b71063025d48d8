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

mod builder;
mod proxy;

pub use builder::{BuildContext, build};
pub use proxy::{
    IDENTITY_END_ENTITY_DIR, identity_volume, image_reference, init_container, proxy_container,
};

use k8s_openapi::api::core::v1::{Container, Volume};

/// One addition to a pod template.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    AddContainer(Box<Container>),
    AddInitContainer(Box<Container>),
    AddVolume(Box<Volume>),
    AddAnnotation { key: String, value: String },
    AddLabel { key: String, value: String },
}

/// The ordered additions for one workload. Rendered either onto the document tree or
/// as a JSON Patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    operations: Vec<PatchOperation>,
}

impl Patch {
    pub fn push(&mut self, operation: PatchOperation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn annotations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.operations.iter().filter_map(|operation| match operation {
            PatchOperation::AddAnnotation { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.operations.iter().filter_map(|operation| match operation {
            PatchOperation::AddLabel { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.operations.iter().filter_map(|operation| match operation {
            PatchOperation::AddContainer(container) => Some(container.as_ref()),
            _ => None,
        })
    }

    pub fn init_containers(&self) -> impl Iterator<Item = &Container> {
        self.operations.iter().filter_map(|operation| match operation {
            PatchOperation::AddInitContainer(container) => Some(container.as_ref()),
            _ => None,
        })
    }

    pub fn volumes(&self) -> impl Iterator<Item = &Volume> {
        self.operations.iter().filter_map(|operation| match operation {
            PatchOperation::AddVolume(volume) => Some(volume.as_ref()),
            _ => None,
        })
    }
}
