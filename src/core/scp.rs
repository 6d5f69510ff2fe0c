//! scp 传输方式：通过 ssh/scp 在本地与一台远程主机之间传输

use super::transport::TransportCapabilities;
use crate::interactors::{Interactor, SshInteractor};
use crate::metadata::{Host, Job, SshOptions};
use crate::resources::Resource;
use std::path::Path;
use std::sync::Arc;

pub struct ScpTransport {
    interactor: Arc<SshInteractor>,
}

impl ScpTransport {
    pub fn new(remote_host: &Host, job: &Job, options: &SshOptions) -> Self {
        Self {
            interactor: Arc::new(SshInteractor::new(remote_host, job, options)),
        }
    }
}

fn file_name(resource: &Resource) -> String {
    Path::new(resource.path_or_name())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| resource.name.clone())
}

impl TransportCapabilities for ScpTransport {
    fn remote_interactor(&self) -> Option<Arc<dyn Interactor>> {
        Some(self.interactor.clone())
    }

    /// 远程资源放在远程主机工作目录下，只保留文件名
    fn remote_resource(&self, resource: &Resource) -> Option<Resource> {
        Some(Resource::new(resource.name.clone(), resource.kind, false).with_path(file_name(resource)))
    }

    fn file_resource(&self, resource: &Resource, host: &Host) -> Resource {
        Resource::new(resource.name.clone(), resource.kind, host.local).with_path(file_name(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;

    fn transport() -> ScpTransport {
        let host = Host::remote("vault", "vault.example.org").with_working_directory("/srv/backups");
        ScpTransport::new(&host, &Job::new("nightly"), &SshOptions::default())
    }

    #[test]
    fn test_remote_resource_keeps_file_name() {
        let resource = Resource::new("dump", ResourceKind::Directory, true)
            .with_path("/var/lib/backups/dump-20140605-040302");

        let remote = transport().remote_resource(&resource).unwrap();

        assert!(!remote.local);
        assert_eq!(remote.kind, ResourceKind::Directory);
        assert_eq!(remote.path.as_deref(), Some("dump-20140605-040302"));
        assert!(!remote.is_stated());
    }

    #[test]
    fn test_file_resource_lands_on_localhost() {
        let resource = Resource::file("dump.tar.gz", false).with_path("archives/dump.tar.gz");
        let localhost = Host::localhost(None);

        let local = transport().file_resource(&resource, &localhost);

        assert!(local.local);
        assert_eq!(local.path.as_deref(), Some("dump.tar.gz"));
    }

    #[test]
    fn test_remote_interactor_is_bound_to_remote_host() {
        let interactor = transport().remote_interactor().unwrap();
        assert_eq!(interactor.host().id, "vault");
        assert_eq!(interactor.host().working_directory.as_deref(), Some("/srv/backups"));
    }
}
