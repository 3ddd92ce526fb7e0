//! The live module registry: CRUD, reflow, camera framing and sub-model placement

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::ConfiguratorConfig;
use crate::geometry::{floor_dimension, Aabb, Size3, Vec3};
use crate::panel::{decompose, DecompositionInput, PanelDiff, PanelSet};
use crate::placement::{
    clamp_to_bounds, compute_auto_position, compute_layout_warnings, resolve_behavior,
    snap_position, validate_model_rules, AutoPositionStrategy, LayoutWarnings, PlacedItem,
    PlacementReason, Rule, RuleBook, RuleContext, RuleViolation,
};

use super::error::RegistryError;
use super::module::{
    check_index, check_position, Module, ModuleSpec, ModuleUpdate, SubModel, SubModelSpec,
};
use super::scene::{MaterialResolver, NodeKey, SceneChange, SceneNode, SceneSink};

/// Advisory framing target for an external camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    /// Centre of all live modules, or the origin when there are none
    pub center: Vec3,
    /// Union of every module's world bounds
    pub bounds: Option<Aabb>,
}

impl Default for CameraTarget {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            bounds: None,
        }
    }
}

/// Where a sub-model ended up after a placement request
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub snapped: bool,
    /// Set when the position came from auto-position
    pub reason: Option<PlacementReason>,
    /// Layout check of the whole module after the placement
    pub warnings: LayoutWarnings,
}

/// A rule violation attributed to one sub-model
#[derive(Debug, Clone, PartialEq)]
pub struct SubModelViolation {
    pub instance_id: String,
    pub violation: RuleViolation,
}

/// Owns every live module and keeps their layout consistent
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    config: ConfiguratorConfig,
    modules: HashMap<String, Module>,
    rules: RuleBook,
    next_seq: u64,
    camera: CameraTarget,
    pending: Vec<SceneChange>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new(config: ConfiguratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ConfiguratorConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Replace the rule book used for placement and validation
    pub fn set_rules(&mut self, rules: RuleBook) {
        self.rules = rules;
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.add(rule);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn module_dimensions(&self, id: &str) -> Option<Size3> {
        self.modules.get(id).map(|m| m.size)
    }

    /// Live modules ordered by index, ties broken by insertion order
    pub fn modules_in_order(&self) -> Vec<&Module> {
        let mut modules: Vec<&Module> = self.modules.values().collect();
        modules.sort_by_key(|m| (m.index, m.seq));
        modules
    }

    pub fn camera_target(&self) -> &CameraTarget {
        &self.camera
    }

    // ── Module CRUD ──────────────────────────────────────────────

    /// Create a module, synthesize its panels and re-layout the row.
    pub fn add_module(&mut self, id: &str, spec: ModuleSpec) -> Result<(), RegistryError> {
        if self.modules.contains_key(id) {
            return Err(RegistryError::duplicate_module(id));
        }
        spec.validate()?;

        let panels_cfg = &self.config.panels;
        let fallback = spec.size.unwrap_or(panels_cfg.default_size);
        let size = Size3::new(
            spec.width.unwrap_or(fallback),
            spec.height.unwrap_or(fallback),
            spec.depth.unwrap_or(fallback),
        )
        .floored(panels_cfg.min_dimension);

        let index = match spec.index {
            Some(index) => index as usize,
            None => self
                .modules
                .values()
                .map(|m| m.index.saturating_add(1))
                .max()
                .unwrap_or(0),
        };

        let position = match spec.position {
            Some(position) if spec.manual_position => position,
            _ => Vec3::new(0.0, size.height / 2.0, 0.0),
        };

        let mut module = Module {
            id: id.to_string(),
            size,
            thickness: spec.thickness.unwrap_or(panels_cfg.default_thickness),
            back_thickness: spec
                .back_thickness
                .unwrap_or(panels_cfg.default_back_thickness),
            features: spec.features,
            index,
            seq: self.next_seq,
            manual_position: spec.manual_position,
            position,
            rotation: spec.rotation.unwrap_or(0.0),
            cad_only: spec.cad_only,
            material: spec.material,
            panels: PanelSet::new(),
            sub_models: Vec::new(),
        };
        self.next_seq += 1;

        self.pending.push(SceneChange::Upsert(NodeKey::Module(id.to_string())));
        if !module.cad_only {
            let specs = decompose(&decomposition_input(&module), &self.config.panels);
            let diff = module.panels.resynthesize(specs);
            self.pending.extend(panel_changes(id, &diff));
        }

        debug!(
            module = id,
            index,
            panels = module.panels.len(),
            "module added"
        );
        self.modules.insert(id.to_string(), module);
        self.reflow();
        self.recompute_camera();
        Ok(())
    }

    /// Apply a partial update. Every provided field is validated before any is applied.
    pub fn update_module(&mut self, id: &str, update: ModuleUpdate) -> Result<(), RegistryError> {
        if !self.modules.contains_key(id) {
            return Err(RegistryError::unknown_module(id));
        }
        update.validate()?;

        let min = self.config.panels.min_dimension;
        let panel_config = self.config.panels.clone();
        let module = self
            .modules
            .get_mut(id)
            .ok_or_else(|| RegistryError::unknown_module(id))?;

        let old_size = module.size;
        let fallback = |explicit: Option<f64>, current: f64| {
            explicit
                .or(update.size)
                .map(|v| floor_dimension(v, min))
                .unwrap_or(current)
        };
        let new_size = Size3::new(
            fallback(update.width, old_size.width),
            fallback(update.height, old_size.height),
            fallback(update.depth, old_size.depth),
        );
        let size_changed = new_size != old_size;

        let mut features = module.features;
        features.shelves = update.shelves.unwrap_or(features.shelves);
        features.doors = update.doors.unwrap_or(features.doors);
        features.drawers = update.drawers.unwrap_or(features.drawers);

        let features_changed = features != module.features;
        let geometry_changed = size_changed
            || features_changed
            || update.thickness.is_some_and(|t| t != module.thickness)
            || update.back_thickness.is_some_and(|t| t != module.back_thickness);

        module.size = new_size;
        module.features = features;
        if let Some(thickness) = update.thickness {
            module.thickness = thickness;
        }
        if let Some(thickness) = update.back_thickness {
            module.back_thickness = thickness;
        }

        let mut changes = vec![SceneChange::Upsert(NodeKey::Module(id.to_string()))];

        if geometry_changed && !module.cad_only {
            let specs = decompose(&decomposition_input(module), &panel_config);
            let diff = if features_changed {
                module.panels.regenerate(specs)
            } else {
                module.panels.resynthesize(specs)
            };
            changes.extend(panel_changes(id, &diff));
        }

        let index_changed = match update.index {
            Some(index) if index as usize != module.index => {
                module.index = index as usize;
                true
            }
            _ => false,
        };

        if let Some(material) = update.material {
            module.material = Some(material);
            changes.extend(
                module
                    .panels
                    .iter()
                    .map(|p| SceneChange::Upsert(panel_key(id, p.role))),
            );
        }
        if let Some(position) = update.position {
            module.position = position;
        }
        if let Some(rotation) = update.rotation {
            module.rotation = rotation;
        }
        let manual_changed = match update.manual_position {
            Some(manual) if manual != module.manual_position => {
                module.manual_position = manual;
                true
            }
            _ => false,
        };

        // Rest on the floor whenever the height changes
        if new_size.height != old_size.height {
            module.position.y = new_size.height / 2.0;
        }

        let needs_reflow =
            index_changed || manual_changed || (size_changed && !module.manual_position);

        debug!(
            module = id,
            geometry_changed,
            index_changed,
            needs_reflow,
            "module updated"
        );

        self.pending.extend(changes);
        if needs_reflow {
            self.reflow();
        }
        self.recompute_camera();
        Ok(())
    }

    /// Remove a module together with its panels and sub-models.
    pub fn remove_module(&mut self, id: &str) -> Result<Module, RegistryError> {
        let module = self
            .modules
            .remove(id)
            .ok_or_else(|| RegistryError::unknown_module(id))?;

        for sub in &module.sub_models {
            self.pending
                .push(SceneChange::Remove(sub_model_key(id, &sub.instance_id)));
        }
        for panel in module.panels.iter() {
            self.pending.push(SceneChange::Remove(panel_key(id, panel.role)));
        }
        self.pending
            .push(SceneChange::Remove(NodeKey::Module(id.to_string())));

        debug!(
            module = id,
            panels = module.panels.len(),
            sub_models = module.sub_models.len(),
            "module removed"
        );
        self.reflow();
        self.recompute_camera();
        Ok(module)
    }

    /// Move a module to a new ordering index and re-layout.
    pub fn set_module_index(&mut self, id: &str, index: f64) -> Result<(), RegistryError> {
        check_index(Some(index))?;
        let module = self
            .modules
            .get_mut(id)
            .ok_or_else(|| RegistryError::unknown_module(id))?;
        module.index = index as usize;
        self.reflow();
        self.recompute_camera();
        Ok(())
    }

    /// Give the listed modules indices 0..n in list order; unlisted modules
    /// follow in their current order.
    pub fn reorder_modules(&mut self, order: &[&str]) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for id in order {
            if !self.modules.contains_key(*id) {
                return Err(RegistryError::unknown_module(*id));
            }
            if !seen.insert(*id) {
                return Err(RegistryError::RepeatedInOrder { id: id.to_string() });
            }
        }

        let rest: Vec<String> = self
            .modules_in_order()
            .into_iter()
            .filter(|m| !seen.contains(m.id.as_str()))
            .map(|m| m.id.clone())
            .collect();

        for (index, id) in order
            .iter()
            .map(|id| id.to_string())
            .chain(rest)
            .enumerate()
        {
            if let Some(module) = self.modules.get_mut(&id) {
                module.index = index;
            }
        }

        self.reflow();
        self.recompute_camera();
        Ok(())
    }

    // ── Layout ───────────────────────────────────────────────────

    /// Pack every non-manual module left to right by index.
    ///
    /// Manual modules keep their coordinates and take no space in the flow.
    /// The vertical axis is never touched. Idempotent.
    pub fn reflow(&mut self) {
        let order: Vec<String> = self
            .modules_in_order()
            .into_iter()
            .filter(|m| !m.manual_position)
            .map(|m| m.id.clone())
            .collect();

        let flow = &self.config.flow;
        let mut cursor = flow.origin_x;
        let mut moved = 0;
        for id in order {
            let Some(module) = self.modules.get_mut(&id) else {
                continue;
            };
            let target = Vec3::new(
                cursor + module.size.width / 2.0,
                module.position.y,
                flow.baseline_z,
            );
            if target != module.position {
                module.position = target;
                self.pending.push(SceneChange::Upsert(NodeKey::Module(id)));
                moved += 1;
            }
            cursor += module.size.width + flow.gap;
        }
        debug!(moved, extent = cursor - flow.origin_x, "reflow");
    }

    /// Recompute the advisory camera target from every module's world bounds.
    pub fn recompute_camera(&mut self) {
        let bounds = self
            .modules
            .values()
            .map(Module::world_bounds)
            .reduce(|a, b| a.union(&b));
        self.camera = CameraTarget {
            center: bounds.map(|b| b.center()).unwrap_or(Vec3::ZERO),
            bounds,
        };
    }

    // ── Sub-models ───────────────────────────────────────────────

    /// Attach a sub-model. Without a requested position it is auto-positioned;
    /// a requested position is clamped into the module.
    pub fn add_sub_model(
        &mut self,
        module_id: &str,
        spec: SubModelSpec,
    ) -> Result<Placement, RegistryError> {
        let module = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;
        if module.sub_model(&spec.instance_id).is_some() {
            return Err(RegistryError::duplicate_sub_model(
                module_id,
                &spec.instance_id,
            ));
        }
        spec.validate()?;

        let size = self.effective_size(spec.size);
        let (position, snapped, reason) = match spec.position {
            Some(requested) => {
                let (position, snapped) =
                    self.place_requested(module, &spec.model, requested, size);
                (position, snapped, None)
            }
            None => {
                let rules = self.rules.for_model(&spec.model);
                let items = self.placed_items(module);
                let auto = compute_auto_position(
                    &module.local_bounds(),
                    &items,
                    &rules,
                    size,
                    &self.config.placement,
                );
                (auto.position, auto.snapped, Some(auto.reason))
            }
        };

        let instance_id = spec.instance_id.clone();
        let module = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;
        module.sub_models.push(SubModel {
            instance_id: spec.instance_id,
            model: spec.model,
            position,
            size: spec.size,
            material: spec.material,
            asset: None,
        });
        self.pending
            .push(SceneChange::Upsert(sub_model_key(module_id, &instance_id)));

        debug!(module = module_id, sub_model = %instance_id, %position, "sub-model added");
        Ok(Placement {
            position,
            snapped,
            reason,
            warnings: self.layout_warnings(module_id)?,
        })
    }

    /// Move a sub-model to a requested position, snapped and clamped into the module.
    pub fn move_sub_model(
        &mut self,
        module_id: &str,
        instance_id: &str,
        requested: Vec3,
    ) -> Result<Placement, RegistryError> {
        check_position(requested)?;
        let module = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;
        let sub = module
            .sub_model(instance_id)
            .ok_or_else(|| RegistryError::unknown_sub_model(module_id, instance_id))?;

        let size = self.effective_size(sub.size);
        let (position, snapped) = self.place_requested(module, &sub.model, requested, size);

        if let Some(sub) = self
            .modules
            .get_mut(module_id)
            .and_then(|m| m.sub_models.iter_mut().find(|s| s.instance_id == instance_id))
        {
            sub.position = position;
        }
        self.pending
            .push(SceneChange::Upsert(sub_model_key(module_id, instance_id)));

        Ok(Placement {
            position,
            snapped,
            reason: None,
            warnings: self.layout_warnings(module_id)?,
        })
    }

    /// Detach a sub-model
    pub fn remove_sub_model(
        &mut self,
        module_id: &str,
        instance_id: &str,
    ) -> Result<SubModel, RegistryError> {
        let module = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;
        let idx = module
            .sub_models
            .iter()
            .position(|s| s.instance_id == instance_id)
            .ok_or_else(|| RegistryError::unknown_sub_model(module_id, instance_id))?;
        let sub = module.sub_models.remove(idx);
        self.pending
            .push(SceneChange::Remove(sub_model_key(module_id, instance_id)));
        Ok(sub)
    }

    /// Completion callback for an asynchronously loaded asset.
    ///
    /// Fills the asset handle and, when the asset reports one, the bounding size.
    pub fn attach_asset(
        &mut self,
        module_id: &str,
        instance_id: &str,
        asset: impl Into<String>,
        size: Option<Size3>,
    ) -> Result<(), RegistryError> {
        if let Some(size) = size {
            for (field, value) in [
                ("sub_model.width", size.width),
                ("sub_model.height", size.height),
                ("sub_model.depth", size.depth),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(RegistryError::invalid(field, value));
                }
            }
        }
        let sub = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?
            .sub_models
            .iter_mut()
            .find(|s| s.instance_id == instance_id)
            .ok_or_else(|| RegistryError::unknown_sub_model(module_id, instance_id))?;
        sub.asset = Some(asset.into());
        if size.is_some() {
            sub.size = size;
        }
        self.pending
            .push(SceneChange::Upsert(sub_model_key(module_id, instance_id)));
        Ok(())
    }

    /// Re-run auto-position for every sub-model in insertion order.
    ///
    /// Sub-models whose model has the `none` strategy keep their position.
    pub fn arrange_module(
        &mut self,
        module_id: &str,
    ) -> Result<Vec<(String, PlacementReason)>, RegistryError> {
        let module = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;

        let bounds = module.local_bounds();
        let mut arranged: Vec<(String, Vec3, Size3)> = Vec::with_capacity(module.sub_models.len());
        let mut reasons = Vec::with_capacity(module.sub_models.len());
        for sub in &module.sub_models {
            let size = self.effective_size(sub.size);
            let rules = self.rules.for_model(&sub.model);
            let behavior = resolve_behavior(&rules, self.config.placement.default_snap_grid);
            let position = if behavior.strategy == AutoPositionStrategy::None {
                reasons.push((sub.instance_id.clone(), PlacementReason::Disabled));
                sub.position
            } else {
                let items: Vec<PlacedItem> = arranged
                    .iter()
                    .map(|(id, position, size)| PlacedItem {
                        id: id.as_str(),
                        position: *position,
                        size: *size,
                    })
                    .collect();
                let auto =
                    compute_auto_position(&bounds, &items, &rules, size, &self.config.placement);
                reasons.push((sub.instance_id.clone(), auto.reason));
                auto.position
            };
            arranged.push((sub.instance_id.clone(), position, size));
        }

        if let Some(module) = self.modules.get_mut(module_id) {
            for (sub, (_, position, _)) in module.sub_models.iter_mut().zip(&arranged) {
                if sub.position != *position {
                    sub.position = *position;
                    self.pending
                        .push(SceneChange::Upsert(sub_model_key(module_id, &sub.instance_id)));
                }
            }
        }
        debug!(module = module_id, count = reasons.len(), "module arranged");
        Ok(reasons)
    }

    /// Collision and containment check over one module's sub-models
    pub fn layout_warnings(&self, module_id: &str) -> Result<LayoutWarnings, RegistryError> {
        let module = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;
        let items = self.placed_items(module);
        Ok(compute_layout_warnings(&module.local_bounds(), &items))
    }

    /// Evaluate the rule book against every sub-model in a module
    pub fn validate_module(&self, module_id: &str) -> Result<Vec<SubModelViolation>, RegistryError> {
        let module = self
            .modules
            .get(module_id)
            .ok_or_else(|| RegistryError::unknown_module(module_id))?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sub in &module.sub_models {
            *counts.entry(sub.model.as_str()).or_default() += 1;
        }

        let mut out = Vec::new();
        for sub in &module.sub_models {
            let rules = self.rules.for_model(&sub.model);
            let ctx = RuleContext {
                module_size: module.size,
                model: &sub.model,
                size: sub.size,
                material: sub.material.as_deref(),
                position: sub.position,
                same_model_count: counts.get(sub.model.as_str()).copied().unwrap_or(0),
                rules: &rules,
            };
            out.extend(
                validate_model_rules(&ctx)
                    .into_iter()
                    .map(|violation| SubModelViolation {
                        instance_id: sub.instance_id.clone(),
                        violation,
                    }),
            );
        }
        Ok(out)
    }

    // ── Scene synchronisation ────────────────────────────────────

    /// True when mutations are waiting to be pushed to a scene
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop queued scene changes without replaying them.
    ///
    /// Every mutation queues changes until [`ModuleRegistry::sync`] drains
    /// them, so a registry that never feeds a scene should call this after
    /// batches of edits. Returns how many changes were dropped.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Push queued changes into `sink`, building nodes from the current state.
    ///
    /// Returns the number of insert/remove calls made. `request_update` is
    /// called once when that number is non-zero.
    pub fn sync<R, S>(&mut self, sink: &mut S, materials: &R) -> usize
    where
        R: MaterialResolver,
        S: SceneSink<R::Handle>,
    {
        let changes = std::mem::take(&mut self.pending);
        let mut inserted: HashSet<NodeKey> = HashSet::new();
        let mut applied = 0;

        for change in changes {
            match change {
                SceneChange::Upsert(key) => {
                    if inserted.contains(&key) {
                        continue;
                    }
                    if let Some(node) = self.scene_node(&key, materials) {
                        inserted.insert(key.clone());
                        sink.insert(key, node);
                        applied += 1;
                    }
                }
                SceneChange::Remove(key) => {
                    inserted.remove(&key);
                    sink.remove(&key);
                    applied += 1;
                }
            }
        }

        if applied > 0 {
            sink.request_update();
        }
        debug!(applied, "scene synchronised");
        applied
    }

    fn scene_node<R: MaterialResolver>(
        &self,
        key: &NodeKey,
        materials: &R,
    ) -> Option<SceneNode<R::Handle>> {
        let module = self.modules.get(key.module())?;
        match key {
            NodeKey::Module(_) => Some(SceneNode::Module {
                position: module.position,
                rotation: module.rotation,
                size: module.size,
            }),
            NodeKey::Panel { role, .. } => {
                let panel = module.panels.get(*role)?;
                Some(SceneNode::Panel {
                    size: panel.size,
                    position: panel.position,
                    material: module.material.as_deref().and_then(|m| materials.resolve(m)),
                })
            }
            NodeKey::SubModel { instance, .. } => {
                let sub = module.sub_model(instance)?;
                Some(SceneNode::SubModel {
                    model: sub.model.clone(),
                    position: sub.position,
                    size: sub.size,
                    asset: sub.asset.clone(),
                    material: sub.material.as_deref().and_then(|m| materials.resolve(m)),
                })
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Size used for placement: unknown sizes count as a minimal cube
    fn effective_size(&self, size: Option<Size3>) -> Size3 {
        size.unwrap_or_else(|| Size3::uniform(self.config.panels.min_dimension))
    }

    fn placed_items<'a>(&self, module: &'a Module) -> Vec<PlacedItem<'a>> {
        module
            .sub_models
            .iter()
            .map(|s| PlacedItem {
                id: &s.instance_id,
                position: s.position,
                size: self.effective_size(s.size),
            })
            .collect()
    }

    /// Snap a caller-requested position to the model's grid, then clamp it into the module
    fn place_requested(
        &self,
        module: &Module,
        model: &str,
        requested: Vec3,
        size: Size3,
    ) -> (Vec3, bool) {
        let rules = self.rules.for_model(model);
        let behavior = resolve_behavior(&rules, self.config.placement.default_snap_grid);
        let snapped = snap_position(requested, behavior.snap_grid);
        let position = clamp_to_bounds(
            snapped,
            size,
            &module.local_bounds(),
            self.config.placement.margin,
        );
        (position, snapped != requested)
    }
}

fn decomposition_input(module: &Module) -> DecompositionInput {
    DecompositionInput {
        size: module.size,
        thickness: module.thickness,
        back_thickness: module.back_thickness,
        features: module.features,
    }
}

fn panel_key(module_id: &str, role: crate::panel::PanelRole) -> NodeKey {
    NodeKey::Panel {
        module: module_id.to_string(),
        role,
    }
}

fn sub_model_key(module_id: &str, instance_id: &str) -> NodeKey {
    NodeKey::SubModel {
        module: module_id.to_string(),
        instance: instance_id.to_string(),
    }
}

fn panel_changes(module_id: &str, diff: &PanelDiff) -> Vec<SceneChange> {
    diff.removed
        .iter()
        .map(|role| SceneChange::Remove(panel_key(module_id, *role)))
        .chain(
            diff.inserted
                .iter()
                .chain(&diff.updated)
                .map(|role| SceneChange::Upsert(panel_key(module_id, *role))),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelRole;
    use crate::placement::{BehaviorRule, DimensionRule, RuleKind, Severity};
    use crate::registry::scene::{PassthroughMaterials, SceneEvent, SceneLog};
    use approx::assert_relative_eq;
    use crate::geometry::Axis;

    fn registry() -> ModuleRegistry {
        ModuleRegistry::new(ConfiguratorConfig::new())
    }

    fn x_of(reg: &ModuleRegistry, id: &str) -> f64 {
        reg.module(id).map(|m| m.position().x).unwrap_or(f64::NAN)
    }

    #[test]
    fn test_reflow_packs_by_index() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).with_index(0))
            .unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0).with_index(1))
            .unwrap();

        assert_relative_eq!(x_of(&reg, "a"), 300.0);
        assert_relative_eq!(x_of(&reg, "b"), 800.0);
        assert_relative_eq!(reg.module("a").unwrap().position().y, 400.0);
        assert_relative_eq!(reg.module("b").unwrap().position().z, 0.0);
    }

    #[test]
    fn test_reflow_respects_gap() {
        let mut reg = ModuleRegistry::new(ConfiguratorConfig::new().with_gap(10.0));
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();
        assert_relative_eq!(x_of(&reg, "b"), 810.0);
    }

    #[test]
    fn test_reflow_is_idempotent() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(450.0, 700.0, 500.0)).unwrap();
        let before: Vec<Vec3> = reg.modules_in_order().iter().map(|m| m.position()).collect();
        reg.reflow();
        reg.reflow();
        let after: Vec<Vec3> = reg.modules_in_order().iter().map(|m| m.position()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_default_index_follows_max() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(100.0, 100.0, 100.0).with_index(4))
            .unwrap();
        reg.add_module("b", ModuleSpec::sized(100.0, 100.0, 100.0)).unwrap();
        assert_eq!(reg.module("b").unwrap().index(), 5);

        let mut empty = registry();
        empty.add_module("only", ModuleSpec::new()).unwrap();
        assert_eq!(empty.module("only").unwrap().index(), 0);
    }

    #[test]
    fn test_default_index_saturates_at_max() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(100.0, 100.0, 100.0).with_index(usize::MAX))
            .unwrap();
        reg.add_module("b", ModuleSpec::sized(100.0, 100.0, 100.0)).unwrap();
        assert_eq!(reg.module("b").unwrap().index(), usize::MAX);

        // equal indices fall back to insertion order
        let order: Vec<&str> = reg.modules_in_order().iter().map(|m| m.id()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_relative_eq!(x_of(&reg, "b"), 150.0);
    }

    #[test]
    fn test_missing_dimensions_use_size_fallback() {
        let mut reg = registry();
        let spec = ModuleSpec {
            width: Some(500.0),
            size: Some(300.0),
            ..ModuleSpec::default()
        };
        reg.add_module("a", spec).unwrap();
        assert_eq!(reg.module_dimensions("a"), Some(Size3::new(500.0, 300.0, 300.0)));

        reg.add_module("b", ModuleSpec::new()).unwrap();
        assert_eq!(reg.module_dimensions("b"), Some(Size3::uniform(1.0)));
    }

    #[test]
    fn test_duplicate_and_invalid_adds_do_not_mutate() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();

        assert_eq!(
            reg.add_module("a", ModuleSpec::sized(100.0, 100.0, 100.0)),
            Err(RegistryError::duplicate_module("a"))
        );
        assert!(reg
            .add_module("b", ModuleSpec::sized(f64::NAN, 100.0, 100.0))
            .is_err());
        assert!(reg
            .add_module("c", ModuleSpec::sized(100.0, -5.0, 100.0))
            .is_err());

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.module_dimensions("a"), Some(Size3::new(600.0, 800.0, 500.0)));
    }

    #[test]
    fn test_update_unknown_module_leaves_state_unchanged() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        let before = reg.module_dimensions("a");

        assert_eq!(
            reg.update_module("missing-id", ModuleUpdate::new().width(10.0)),
            Err(RegistryError::unknown_module("missing-id"))
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.module_dimensions("a"), before);
        assert_relative_eq!(x_of(&reg, "a"), 300.0);
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        let result = reg.update_module(
            "a",
            ModuleUpdate::new().width(700.0).height(f64::INFINITY),
        );
        assert!(result.is_err());
        assert_eq!(reg.module_dimensions("a"), Some(Size3::new(600.0, 800.0, 500.0)));
    }

    #[test]
    fn test_width_update_reflows_neighbours() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();
        reg.update_module("a", ModuleUpdate::new().width(300.0)).unwrap();

        assert_relative_eq!(x_of(&reg, "a"), 150.0);
        assert_relative_eq!(x_of(&reg, "b"), 500.0);
    }

    #[test]
    fn test_height_update_rests_on_floor() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.update_module("a", ModuleUpdate::new().height(2000.0)).unwrap();
        assert_relative_eq!(reg.module("a").unwrap().position().y, 1000.0);
    }

    #[test]
    fn test_update_resynthesizes_panels_in_place() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).with_shelves(1))
            .unwrap();
        let top_serial = reg
            .module("a")
            .and_then(|m| m.panels().get(PanelRole::Top))
            .map(|p| p.serial);

        reg.update_module("a", ModuleUpdate::new().width(900.0)).unwrap();

        let module = reg.module("a").unwrap();
        assert_eq!(module.panels().len(), 6);
        assert_eq!(module.panels().get(PanelRole::Top).map(|p| p.serial), top_serial);
        assert_relative_eq!(
            module.panels().get(PanelRole::Top).unwrap().size.width,
            900.0
        );
    }

    #[test]
    fn test_feature_change_regenerates_panels() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).with_shelves(1))
            .unwrap();
        let serial_of = |reg: &ModuleRegistry, role| {
            reg.module("a")
                .and_then(|m| m.panels().get(role))
                .map(|p| p.serial)
        };
        let top_serial = serial_of(&reg, PanelRole::Top);
        let shelf_serial = serial_of(&reg, PanelRole::Shelf(0));

        reg.update_module("a", ModuleUpdate::new().shelves(2)).unwrap();

        assert_eq!(reg.module("a").unwrap().panels().len(), 7);
        assert!(serial_of(&reg, PanelRole::Shelf(1)).is_some());
        assert_ne!(serial_of(&reg, PanelRole::Top), top_serial);
        assert_ne!(serial_of(&reg, PanelRole::Shelf(0)), shelf_serial);
    }

    #[test]
    fn test_manual_modules_stay_out_of_flow() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module(
            "island",
            ModuleSpec::sized(1000.0, 900.0, 600.0).manual_at(Vec3::new(-2000.0, 450.0, 1500.0)),
        )
        .unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();

        assert_eq!(
            reg.module("island").unwrap().position(),
            Vec3::new(-2000.0, 450.0, 1500.0)
        );
        assert_relative_eq!(x_of(&reg, "b"), 800.0);

        reg.update_module("island", ModuleUpdate::new().manual(false))
            .unwrap();
        assert_relative_eq!(x_of(&reg, "island"), 1100.0);
        assert_relative_eq!(x_of(&reg, "b"), 1800.0);
    }

    #[test]
    fn test_set_index_reorders_without_overlap() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();
        reg.add_module("c", ModuleSpec::sized(200.0, 800.0, 500.0)).unwrap();

        reg.set_module_index("a", 10.0).unwrap();
        let order: Vec<&str> = reg.modules_in_order().iter().map(|m| m.id()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_relative_eq!(x_of(&reg, "b"), 200.0);
        assert_relative_eq!(x_of(&reg, "c"), 500.0);
        assert_relative_eq!(x_of(&reg, "a"), 900.0);

        assert!(reg.set_module_index("a", 1.5).is_err());
        assert!(reg.set_module_index("nope", 1.0).is_err());
    }

    #[test]
    fn test_equal_indices_keep_insertion_order() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(100.0, 100.0, 100.0).with_index(0))
            .unwrap();
        reg.add_module("b", ModuleSpec::sized(100.0, 100.0, 100.0).with_index(0))
            .unwrap();
        assert_relative_eq!(x_of(&reg, "a"), 50.0);
        assert_relative_eq!(x_of(&reg, "b"), 150.0);
    }

    #[test]
    fn test_reorder_modules() {
        let mut reg = registry();
        for id in ["a", "b", "c"] {
            reg.add_module(id, ModuleSpec::sized(100.0, 100.0, 100.0)).unwrap();
        }
        reg.reorder_modules(&["c", "a"]).unwrap();
        let order: Vec<&str> = reg.modules_in_order().iter().map(|m| m.id()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert_relative_eq!(x_of(&reg, "c"), 50.0);

        assert_eq!(
            reg.reorder_modules(&["a", "a"]),
            Err(RegistryError::RepeatedInOrder { id: "a".to_string() })
        );
        assert!(reg.reorder_modules(&["zzz"]).is_err());
    }

    #[test]
    fn test_remove_module_closes_gap() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();
        let removed = reg.remove_module("a").unwrap();
        assert_eq!(removed.id(), "a");
        assert_relative_eq!(x_of(&reg, "b"), 200.0);
        assert!(reg.remove_module("a").is_err());
    }

    #[test]
    fn test_cad_only_module_has_no_panels() {
        let mut reg = registry();
        reg.add_module("fridge", ModuleSpec::sized(600.0, 1800.0, 650.0).cad_only())
            .unwrap();
        let module = reg.module("fridge").unwrap();
        assert!(module.panels().is_empty());
        reg.update_module("fridge", ModuleUpdate::new().width(700.0).shelves(3))
            .unwrap();
        assert!(reg.module("fridge").unwrap().panels().is_empty());
        assert_relative_eq!(x_of(&reg, "fridge"), 350.0);
    }

    #[test]
    fn test_camera_target_frames_all_modules() {
        let mut reg = registry();
        assert_eq!(reg.camera_target().bounds, None);
        assert_eq!(reg.camera_target().center, Vec3::ZERO);

        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_module("b", ModuleSpec::sized(400.0, 800.0, 500.0)).unwrap();
        let camera = reg.camera_target();
        let bounds = camera.bounds.unwrap();
        assert_relative_eq!(bounds.min.x, 0.0);
        assert_relative_eq!(bounds.max.x, 1000.0);
        assert_relative_eq!(camera.center.x, 500.0);
        assert_relative_eq!(camera.center.y, 400.0);
    }

    #[test]
    fn test_sub_model_auto_position_and_move() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).cad_only())
            .unwrap();
        let placement = reg
            .add_sub_model("a", SubModelSpec::new("h1", "hinge").with_size(40.0, 40.0, 40.0))
            .unwrap();
        assert!(placement.warnings.is_empty());
        assert!(matches!(
            placement.reason,
            Some(PlacementReason::Stacked { layer: 0, column: 0 })
        ));
        let bounds = reg.module("a").unwrap().local_bounds();
        assert!(bounds.contains(placement.position));

        let moved = reg
            .move_sub_model("a", "h1", Vec3::new(5000.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(moved.position.x, 300.0 - 1.0 - 20.0);
        assert_eq!(
            reg.module("a").and_then(|m| m.sub_model("h1")).map(|s| s.position),
            Some(moved.position)
        );

        assert_eq!(
            reg.add_sub_model("a", SubModelSpec::new("h1", "hinge")),
            Err(RegistryError::duplicate_sub_model("a", "h1"))
        );
        assert!(reg.move_sub_model("a", "ghost", Vec3::ZERO).is_err());
    }

    #[test]
    fn test_requested_position_snaps_to_model_grid() {
        let mut reg = registry();
        reg.add_rule(Rule::new(
            "grid-25",
            "knob",
            RuleKind::Behavior(BehaviorRule {
                snap_grid: Some(25.0),
                strategy: None,
            }),
        ));
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        let placement = reg
            .add_sub_model(
                "a",
                SubModelSpec::new("k", "knob")
                    .with_size(10.0, 10.0, 10.0)
                    .at(Vec3::new(37.0, 12.0, -60.0)),
            )
            .unwrap();
        assert!(placement.snapped);
        assert_eq!(placement.reason, None);
        assert_eq!(placement.position, Vec3::new(25.0, 0.0, -50.0));
    }

    #[test]
    fn test_attach_asset_and_arrange() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_sub_model("a", SubModelSpec::new("x", "box").at(Vec3::ZERO))
            .unwrap();
        reg.add_sub_model("a", SubModelSpec::new("y", "box").at(Vec3::ZERO))
            .unwrap();
        reg.attach_asset("a", "x", "mesh://box", Some(Size3::uniform(100.0)))
            .unwrap();
        reg.attach_asset("a", "y", "mesh://box", Some(Size3::uniform(100.0)))
            .unwrap();

        let warnings = reg.layout_warnings("a").unwrap();
        assert_eq!(warnings.collisions.len(), 1);

        let reasons = reg.arrange_module("a").unwrap();
        assert_eq!(reasons.len(), 2);
        assert!(reg.layout_warnings("a").unwrap().is_empty());
        assert_eq!(
            reg.module("a")
                .and_then(|m| m.sub_model("x"))
                .and_then(|s| s.asset.clone()),
            Some("mesh://box".to_string())
        );

        assert!(reg
            .attach_asset("a", "x", "mesh://box", Some(Size3::new(0.0, 1.0, 1.0)))
            .is_err());
    }

    #[test]
    fn test_validate_module_reports_dimension_error() {
        let mut reg = registry();
        reg.add_rule(Rule::new(
            "max-height",
            "panel-insert",
            RuleKind::Dimension(DimensionRule {
                axis: Axis::Height,
                min: None,
                max: Some(500.0),
                relative: false,
            }),
        ));
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        reg.add_sub_model(
            "a",
            SubModelSpec::new("p", "panel-insert")
                .with_size(100.0, 600.0, 20.0)
                .at(Vec3::ZERO),
        )
        .unwrap();

        let violations = reg.validate_module("a").unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_id, "p");
        assert_eq!(violations[0].violation.rule_id, "max-height");
        assert_eq!(violations[0].violation.severity, Severity::Error);
    }

    #[test]
    fn test_sync_replays_changes_once() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).with_material("oak"))
            .unwrap();
        reg.update_module("a", ModuleUpdate::new().width(700.0)).unwrap();

        let mut scene: SceneLog<String> = SceneLog::new();
        let applied = reg.sync(&mut scene, &PassthroughMaterials);
        // module node plus five carcass panels
        assert_eq!(applied, 6);
        assert_eq!(scene.nodes.len(), 6);
        assert_eq!(scene.updates, 1);
        assert!(!reg.has_pending_changes());

        let top = scene.nodes.get(&NodeKey::Panel {
            module: "a".to_string(),
            role: PanelRole::Top,
        });
        assert!(matches!(
            top,
            Some(SceneNode::Panel { material: Some(m), size, .. })
                if m == "oak" && size.width == 700.0
        ));

        assert_eq!(reg.sync(&mut scene, &PassthroughMaterials), 0);
        assert_eq!(scene.updates, 1);
    }

    #[test]
    fn test_clear_pending_discards_queue() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0)).unwrap();
        assert!(reg.has_pending_changes());

        // module, five carcass panels, then the reflow move
        assert_eq!(reg.clear_pending(), 7);
        assert!(!reg.has_pending_changes());

        let mut scene: SceneLog<String> = SceneLog::new();
        assert_eq!(reg.sync(&mut scene, &PassthroughMaterials), 0);
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn test_sync_removes_dropped_panels() {
        let mut reg = registry();
        reg.add_module("a", ModuleSpec::sized(600.0, 800.0, 500.0).with_shelves(2))
            .unwrap();
        let mut scene: SceneLog<String> = SceneLog::new();
        reg.sync(&mut scene, &PassthroughMaterials);
        scene.take_events();

        reg.update_module("a", ModuleUpdate::new().shelves(1)).unwrap();
        reg.sync(&mut scene, &PassthroughMaterials);
        let shelf_1 = NodeKey::Panel {
            module: "a".to_string(),
            role: PanelRole::Shelf(1),
        };
        assert!(scene.take_events().contains(&SceneEvent::Remove(shelf_1.clone())));
        assert!(!scene.nodes.contains_key(&shelf_1));

        reg.remove_module("a").unwrap();
        reg.sync(&mut scene, &PassthroughMaterials);
        assert!(scene.nodes.is_empty());
    }
}
