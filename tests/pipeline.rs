use iaview::data::{Coordinates, Dataset, Metadata};
use iaview::session::Session;
use iaview::slicing::{
    extract_region, AxisRole, AxisRoleAssignment, Pipeline, PipelineEvent, Region, RegionEvent,
    RegionKind, RegionUpdate, SelectorState, StageId,
};
use iaview::ErrorKind;
use ndarray::{Array, IxDyn};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Values spell out their own index in decimal, e.g. `[1, 2, 3, 0]` is 1230.
fn spelled(shape: &[usize]) -> Dataset {
    let array = Array::from_shape_fn(IxDyn(shape), |ix| {
        (0..shape.len()).fold(0.0, |acc, i| acc * 10.0 + ix[i] as f64)
    });
    let coordinates = shape.iter().map(|&n| Coordinates::indices(n)).collect();
    let labels = ["kx", "ky", "E", "T"][..shape.len()]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Dataset::new(array, coordinates, labels, Metadata::new()).unwrap()
}

fn extract_default(dataset: &Dataset, region: &Region) -> Dataset {
    let roles = AxisRoleAssignment::new(dataset.shape()).unwrap();
    extract_region(dataset, &roles, region).unwrap()
}

struct Chain {
    session: Session,
    cuts: Vec<StageId>,
    regions: Vec<Region>,
}

/// A 4-D session with every line cut enabled and committed.
fn committed_chain() -> Chain {
    let mut session = Session::new(spelled(&[5, 6, 4, 3])).unwrap();
    let cuts = session.line_cuts().to_vec();
    let regions = vec![
        Region::line((0, 0), (4, 5)),
        Region::line((1, 0), (5, 3)),
        Region::line((0, 2), (5, 0)),
    ];
    let pipeline = session.pipeline_mut();
    for (&cut, &region) in cuts.iter().zip(&regions) {
        pipeline.enable_region(cut).unwrap();
        pipeline
            .update_region(cut, region, RegionUpdate::Finished)
            .unwrap();
    }
    Chain {
        session,
        cuts,
        regions,
    }
}

fn composed(root: &Dataset, regions: &[Region]) -> Vec<Dataset> {
    let mut out = Vec::new();
    let mut current = root.clone();
    for region in regions {
        current = extract_default(&current, region);
        out.push(current.clone());
    }
    out
}

#[test]
fn committed_chain_matches_direct_extraction() {
    let mut chain = committed_chain();
    let root = Arc::clone(chain.session.dataset());
    let expected = composed(&root, &chain.regions);

    let pipeline = chain.session.pipeline_mut();
    for (cut, want) in chain.cuts.iter().zip(&expected) {
        let got = pipeline.input(*cut).unwrap().unwrap();
        assert_eq!(&*got, want);
    }
    assert_eq!(expected[0].ndim(), 3);
    assert_eq!(expected[1].ndim(), 2);
    assert_eq!(expected[2].ndim(), 1);

    let profile = pipeline.projected(chain.cuts[2]).unwrap().unwrap();
    assert_eq!(profile.ndim(), 1);
    assert_eq!(profile.values, expected[2].array().clone());
}

#[test]
fn committing_upstream_cascades_to_the_end() {
    let mut chain = committed_chain();
    let root = Arc::clone(chain.session.dataset());
    chain.regions[0] = Region::line((4, 0), (0, 3));

    let pipeline = chain.session.pipeline_mut();
    pipeline
        .update_region(chain.cuts[0], chain.regions[0], RegionUpdate::Finished)
        .unwrap();
    for &cut in &chain.cuts {
        assert!(!pipeline.is_stale(cut).unwrap());
    }

    let expected = composed(&root, &chain.regions);
    let last = pipeline.last_input(chain.cuts[2]).unwrap().unwrap();
    assert_eq!(&**last, &expected[2]);
}

#[test]
fn dragging_defers_downstream_work_until_read() {
    let mut chain = committed_chain();
    let root = Arc::clone(chain.session.dataset());
    chain.regions[0] = Region::line((0, 5), (4, 0));

    let pipeline = chain.session.pipeline_mut();
    pipeline
        .update_region(chain.cuts[0], chain.regions[0], RegionUpdate::Dragging)
        .unwrap();
    assert!(!pipeline.is_stale(chain.cuts[0]).unwrap());
    assert!(pipeline.is_stale(chain.cuts[1]).unwrap());
    assert!(!pipeline.is_stale(chain.cuts[2]).unwrap());

    // reading the end of the chain pulls every ancestor up to date
    let expected = composed(&root, &chain.regions);
    let got = pipeline.input(chain.cuts[2]).unwrap().unwrap();
    assert_eq!(&*got, &expected[2]);
    assert!(!pipeline.is_stale(chain.cuts[1]).unwrap());
}

#[test]
fn disabling_a_middle_cut_clears_everything_below() {
    let mut chain = committed_chain();
    let pipeline = chain.session.pipeline_mut();
    let cleared = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&cleared);
    pipeline.subscribe(move |event| {
        if let PipelineEvent::Cleared(id) = event {
            sink.borrow_mut().push(*id);
        }
    });

    pipeline.disable_region(chain.cuts[1]).unwrap();

    assert!(pipeline.input(chain.cuts[0]).unwrap().is_some());
    assert!(pipeline.input(chain.cuts[1]).unwrap().is_none());
    assert!(pipeline.input(chain.cuts[2]).unwrap().is_none());
    assert_eq!(
        pipeline.selector(chain.cuts[2]).unwrap().unwrap().state(),
        SelectorState::Disabled
    );
    assert_eq!(*cleared.borrow(), vec![chain.cuts[1], chain.cuts[2]]);
}

#[test]
fn roi_is_clamped_to_the_view() {
    let mut session = Session::new(spelled(&[5, 6, 4, 3])).unwrap();
    let roi = session.rois()[0];
    let pipeline = session.pipeline_mut();
    pipeline.enable_region(roi).unwrap();
    pipeline
        .update_region(roi, Region::rectangle((-3, 100), (2, 4)), RegionUpdate::Finished)
        .unwrap();

    let input = pipeline.input(roi).unwrap().unwrap();
    assert_eq!(input.shape(), &[3, 2, 4, 3]);
    assert_eq!(input.array()[[0, 0, 0, 0]], 400.0);
    assert_eq!(
        input.axes().axis(1).unwrap().coordinates(),
        &Coordinates::Numeric(vec![4.0, 5.0])
    );
}

#[test]
fn roi_outside_the_view_empties_its_stage() {
    let mut session = Session::new(spelled(&[5, 6])).unwrap();
    let roi = session.rois()[1];
    let pipeline = session.pipeline_mut();
    pipeline.enable_region(roi).unwrap();
    assert!(pipeline.input(roi).unwrap().is_some());

    pipeline
        .update_region(roi, Region::rectangle((20, 20), (30, 30)), RegionUpdate::Finished)
        .unwrap();
    assert!(pipeline.input(roi).unwrap().is_none());
    // the region itself is kept so it can be dragged back
    assert!(pipeline.selector(roi).unwrap().unwrap().is_enabled());

    pipeline
        .update_region(roi, Region::rectangle((1, 1), (2, 2)), RegionUpdate::Finished)
        .unwrap();
    assert_eq!(pipeline.input(roi).unwrap().unwrap().shape(), &[2, 2]);
}

#[test]
fn swapping_roles_recenters_child_regions() {
    let mut session = Session::new(spelled(&[5, 6, 4])).unwrap();
    let roi = session.rois()[0];
    let main = session.main_view();
    let pipeline = session.pipeline_mut();
    pipeline.enable_region(roi).unwrap();
    pipeline
        .update_region(roi, Region::rectangle((1, 1), (2, 2)), RegionUpdate::Finished)
        .unwrap();

    pipeline.assign_role(main, 2, AxisRole::Horizontal).unwrap();

    let roles = pipeline.roles(main).unwrap().unwrap();
    assert_eq!(roles.horizontal_axis(), 2);
    assert_eq!(roles.role(0).unwrap(), AxisRole::Fixed(0));
    let region = *pipeline.selector(roi).unwrap().unwrap().region().unwrap();
    assert_eq!(region, Region::rectangle((0, 0), (3, 5)));
    assert_eq!(pipeline.input(roi).unwrap().unwrap().shape(), &[5, 6, 4]);
}

#[test]
fn fixed_index_only_changes_the_projection() {
    let mut session = Session::new(spelled(&[5, 6, 4])).unwrap();
    let roi = session.rois()[0];
    let main = session.main_view();
    let pipeline = session.pipeline_mut();
    pipeline.enable_region(roi).unwrap();
    let before = pipeline.input(roi).unwrap().unwrap();

    pipeline.set_fixed_index(main, 2, 3).unwrap();

    let slice = pipeline.projected(main).unwrap().unwrap();
    assert_eq!(slice.get(&[1, 2]), Some(123.0));
    let after = pipeline.input(roi).unwrap().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn invalid_role_changes_leave_the_view_alone() {
    let mut pipeline = Pipeline::new(Arc::new(spelled(&[3, 4]))).unwrap();
    let root = pipeline.root();
    let before = pipeline.projected(root).unwrap().unwrap().clone();

    let err = pipeline.assign_role(root, 7, AxisRole::Vertical).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = pipeline.set_fixed_index(root, 0, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(pipeline.projected(root).unwrap().unwrap(), &before);
}

#[test]
fn display_transform_follows_coordinates() {
    let dataset = Dataset::new(
        Array::zeros(IxDyn(&[3, 2])),
        vec![
            Coordinates::Numeric(vec![0.0, 10.0, 20.0]),
            Coordinates::Categorical(vec!["a".into(), "b".into()]),
        ],
        vec!["x".into(), "y".into()],
        Metadata::new(),
    )
    .unwrap();
    let mut pipeline = Pipeline::new(Arc::new(dataset)).unwrap();
    let root = pipeline.root();
    let slice = pipeline.projected(root).unwrap().unwrap();

    assert_eq!(slice.origin, vec![0.0, 0.0]);
    assert_eq!(slice.scale, vec![10.0, 1.0]);
    assert_eq!(slice.labels, vec!["x", "y"]);
}

#[test]
fn line_cut_on_a_line_view_is_rejected() {
    let mut pipeline = Pipeline::new(Arc::new(spelled(&[6]))).unwrap();
    let root = pipeline.root();
    let child = pipeline.attach(root, RegionKind::Line).unwrap();

    let err = pipeline.enable_region(child).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(pipeline.input(child).unwrap().is_none());
}

#[test]
fn roles_survive_a_region_leaving_the_view() {
    let mut pipeline = Pipeline::new(Arc::new(spelled(&[5, 6, 4]))).unwrap();
    let roi = pipeline.attach(pipeline.root(), RegionKind::Rectangle).unwrap();
    pipeline.enable_region(roi).unwrap();
    pipeline.assign_role(roi, 2, AxisRole::Horizontal).unwrap();
    pipeline.set_fixed_index(roi, 0, 3).unwrap();
    let chosen = vec![AxisRole::Fixed(3), AxisRole::Vertical, AxisRole::Horizontal];
    assert_eq!(pipeline.roles(roi).unwrap().unwrap().roles(), chosen.as_slice());

    pipeline
        .update_region(roi, Region::rectangle((20, 20), (30, 30)), RegionUpdate::Dragging)
        .unwrap();
    assert!(pipeline.input(roi).unwrap().is_none());
    assert_eq!(pipeline.roles(roi).unwrap().unwrap().roles(), chosen.as_slice());

    pipeline
        .update_region(roi, Region::rectangle((0, 0), (4, 5)), RegionUpdate::Finished)
        .unwrap();
    assert_eq!(pipeline.roles(roi).unwrap().unwrap().roles(), chosen.as_slice());
    // E horizontal, ky vertical, kx fixed at 3
    let slice = pipeline.projected(roi).unwrap().unwrap();
    assert_eq!(slice.bounds(), vec![4, 6]);
    assert_eq!(slice.get(&[2, 1]), Some(312.0));

    // disabling is a reset: the next enable starts from default roles
    pipeline.disable_region(roi).unwrap();
    pipeline.enable_region(roi).unwrap();
    assert_eq!(
        pipeline.roles(roi).unwrap().unwrap().roles(),
        &[AxisRole::Horizontal, AxisRole::Vertical, AxisRole::Fixed(0)]
    );
}

type EventLog = Rc<RefCell<Vec<(&'static str, RegionEvent)>>>;

fn record(pipeline: &mut Pipeline, id: StageId, name: &'static str, log: &EventLog) {
    let sink = Rc::clone(log);
    pipeline
        .selector_mut(id)
        .unwrap()
        .unwrap()
        .subscribe(move |event| sink.borrow_mut().push((name, event.clone())));
}

#[test]
fn region_changes_are_announced_to_subscribers() {
    let mut pipeline = Pipeline::new(Arc::new(spelled(&[4, 5, 3]))).unwrap();
    let roi = pipeline.attach(pipeline.root(), RegionKind::Rectangle).unwrap();
    let cut = pipeline.attach(roi, RegionKind::Line).unwrap();
    let idle = pipeline.attach(roi, RegionKind::Rectangle).unwrap();
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    record(&mut pipeline, roi, "roi", &log);
    record(&mut pipeline, cut, "cut", &log);
    record(&mut pipeline, idle, "idle", &log);

    let full = Region::rectangle((0, 0), (3, 4));
    let moved = Region::rectangle((1, 1), (2, 2));
    let committed = Region::rectangle((1, 1), (3, 3));
    pipeline.enable_region(roi).unwrap();
    pipeline
        .update_region(roi, moved, RegionUpdate::Dragging)
        .unwrap();
    pipeline
        .update_region(roi, committed, RegionUpdate::Finished)
        .unwrap();
    assert_eq!(pipeline.center_region(roi).unwrap(), full);
    assert_eq!(
        *log.borrow(),
        vec![
            ("roi", RegionEvent::Enabled(full)),
            ("roi", RegionEvent::Moved(moved)),
            ("roi", RegionEvent::Committed(committed)),
            ("roi", RegionEvent::Committed(full)),
        ]
    );

    pipeline.enable_region(cut).unwrap();
    log.borrow_mut().clear();
    pipeline.disable_region(roi).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![("roi", RegionEvent::Disabled), ("cut", RegionEvent::Disabled)]
    );
}
