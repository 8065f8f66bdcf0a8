//! Built-in analyses pre-registered in the global registry.

use std::{any::Any, sync::Arc};

use crate::{
    analysis::{Analysis, AnalysisConfig, AnalysisRegistry, ErrorLog, CFG, DDG, VFG},
    cfg::CfgAnalysis,
    project::Project,
    Error, Result,
};

/// Installs the built-in constructors. Called once while the global
/// registry is being initialized.
pub(crate) fn register_builtins(registry: &AnalysisRegistry) {
    registry.register(CFG, Arc::new(CfgAnalysis::construct));
    registry.register(VFG, Arc::new(VfgAnalysis::construct));
    registry.register(DDG, Arc::new(DdgAnalysis::construct));
}

/// Resolves the CFG a derived analysis is seeded from.
///
/// Requests the project's cached CFG (building it with defaults if this is
/// the first access) and downcasts it to the concrete type.
fn upstream_cfg(project: &Project) -> Result<Arc<CfgAnalysis>> {
    let analysis = project.analyses().get(project, CFG)?;
    analysis
        .as_any_arc()
        .downcast::<CfgAnalysis>()
        .map_err(|_| Error::AnalysisType {
            name: CFG.to_string(),
            expected: "CfgAnalysis",
        })
}

/// Value flow graph analysis, seeded from the project's CFG.
///
/// Tracks how values propagate between program points. The propagation
/// passes are not implemented yet; constructing the analysis resolves and
/// pins the CFG it will consume.
#[derive(Debug)]
pub struct VfgAnalysis {
    cfg: Arc<CfgAnalysis>,
    errors: ErrorLog,
}

impl VfgAnalysis {
    pub(crate) fn construct(
        project: &Project,
        _config: AnalysisConfig,
    ) -> Result<Arc<dyn Analysis>> {
        Ok(Arc::new(VfgAnalysis {
            cfg: upstream_cfg(project)?,
            errors: ErrorLog::new(),
        }))
    }

    /// The control flow graph analysis this one is seeded from.
    #[must_use]
    pub fn cfg(&self) -> &CfgAnalysis {
        &self.cfg
    }
}

impl Analysis for VfgAnalysis {
    fn name(&self) -> &str {
        VFG
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Data dependency graph analysis, seeded from the project's CFG.
///
/// Relates definitions to their uses across the recovered graph. As with
/// [`VfgAnalysis`], the dependence passes are not implemented yet.
#[derive(Debug)]
pub struct DdgAnalysis {
    cfg: Arc<CfgAnalysis>,
    errors: ErrorLog,
}

impl DdgAnalysis {
    pub(crate) fn construct(
        project: &Project,
        _config: AnalysisConfig,
    ) -> Result<Arc<dyn Analysis>> {
        Ok(Arc::new(DdgAnalysis {
            cfg: upstream_cfg(project)?,
            errors: ErrorLog::new(),
        }))
    }

    /// The control flow graph analysis this one is seeded from.
    #[must_use]
    pub fn cfg(&self) -> &CfgAnalysis {
        &self.cfg
    }
}

impl Analysis for DdgAnalysis {
    fn name(&self) -> &str {
        DDG
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
