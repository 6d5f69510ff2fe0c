//! 流水线项目 - 按顺序保存每一步的产出

use crate::resources::Resource;

#[derive(Debug, Clone, Default)]
pub struct Project {
    pub id: String,
    products: Vec<Resource>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            products: Vec::new(),
        }
    }

    /// 以初始资源开始流水线
    pub fn start_with(&mut self, resource: Resource) {
        self.products.clear();
        self.products.push(resource);
    }

    pub fn store_product(&mut self, resource: Resource) {
        self.products.push(resource);
    }

    pub fn last_product(&self) -> Option<&Resource> {
        self.products.last()
    }

    pub fn products(&self) -> &[Resource] {
        &self.products
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_are_ordered() {
        let mut project = Project::new("nightly");
        assert!(project.last_product().is_none());

        project.start_with(Resource::database("app"));
        project.store_product(Resource::file("app.tar.gz", true));

        assert_eq!(project.products().len(), 2);
        assert_eq!(project.last_product().unwrap().name, "app.tar.gz");

        project.start_with(Resource::database("other"));
        assert_eq!(project.products().len(), 1);
    }
}
